/// Expression evaluation over in-memory band arrays.
///
/// Arrays are `f64` with NumPy broadcasting between operands. Inputs are 3-D
/// `(bands, rows, cols)`; `read i j` and `take` yield 2-D bands.
use ndarray::{Array2, Array3, ArrayD, ArrayView2, ArrayViewD, Axis, Ix2, Ix3, IxDyn, Zip};

use super::errors::CalcError;
use super::parse::Expr;
use crate::native::alg;
use crate::raster::DataType;
use crate::raster::dtype::cast_through;

/// An evaluated value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Array(ArrayD<f64>),
    Str(String),
}

impl Value {
    fn kind(&self) -> String {
        match self {
            Self::Scalar(_) => "a scalar".to_owned(),
            Self::Array(a) => format!("a {}-D array", a.ndim()),
            Self::Str(_) => "a string".to_owned(),
        }
    }
}

/// One input dataset, read fully into memory.
#[derive(Debug, Clone)]
pub struct Input {
    /// Short name from `--name`, if any.
    pub name: Option<String>,
    /// Pixel values as `(bands, rows, cols)`.
    pub data: Array3<f64>,
}

/// Evaluation context: the inputs an expression may refer to.
pub struct Context<'a> {
    inputs: &'a [Input],
}

impl<'a> Context<'a> {
    #[must_use]
    pub fn new(inputs: &'a [Input]) -> Self {
        Self { inputs }
    }

    /// Evaluate an expression tree.
    ///
    /// # Errors
    ///
    /// Returns `CalcError` for unknown names/functions, bad arguments and
    /// shape mismatches.
    pub fn eval(&self, expr: &Expr) -> Result<Value, CalcError> {
        match expr {
            Expr::Number(n) => Ok(Value::Scalar(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Symbol(name) => self.lookup(name).map(|d| Value::Array(d.clone().into_dyn())),
            Expr::List(items) => {
                let (head, args) = items
                    .split_first()
                    .ok_or_else(|| CalcError::UnknownFunction(String::new()))?;
                let Expr::Symbol(func) = head else {
                    return Err(CalcError::Type {
                        func: "(".to_owned(),
                        expected: "a function name in first position",
                    });
                };
                self.call(func, args)
            }
        }
    }

    /// Named inputs by name; unnamed inputs as `_i1`, `_i2`, ... by position.
    fn lookup(&self, name: &str) -> Result<&Array3<f64>, CalcError> {
        self.inputs
            .iter()
            .enumerate()
            .find(|(i, input)| match &input.name {
                Some(n) => n == name,
                None => name == format!("_i{}", i + 1),
            })
            .map(|(_, input)| &input.data)
            .ok_or_else(|| CalcError::UnknownName(name.to_owned()))
    }

    fn call(&self, func: &str, args: &[Expr]) -> Result<Value, CalcError> {
        match func {
            "read" => self.read(args),
            "take" => {
                arity(func, args, 2, 2, "2")?;
                let value = self.eval(&args[0])?;
                let index = self.index_arg(func, &args[1])?;
                take(value, index)
            }
            "band" => {
                arity(func, args, 2, 2, "2")?;
                let value = self.dataset_arg(func, &args[0])?;
                let index = self.index_arg(func, &args[1])?;
                take(value, index)
            }
            "bands" => {
                arity(func, args, 1, 1, "1")?;
                self.dataset_arg(func, &args[0])
            }
            "fillnodata" => self.fillnodata(args),
            "sieve" => self.sieve(args),
            "asarray" => {
                arity(func, args, 1, usize::MAX, "at least 1")?;
                let values = self.eval_all(args)?;
                asarray(values)
            }
            "where" => {
                arity(func, args, 3, 3, "3")?;
                let [cond, a, b]: [Value; 3] =
                    self.eval_all(args)?.try_into().map_err(|_: Vec<Value>| CalcError::Arity {
                        func: func.to_owned(),
                        expected: "3",
                        got: args.len(),
                    })?;
                select(cond, a, b)
            }
            "sqrt" => self.unary(func, args, f64::sqrt),
            "abs" => self.unary(func, args, f64::abs),
            "exp" => self.unary(func, args, f64::exp),
            "log" => self.unary(func, args, f64::ln),
            "-" if args.len() == 1 => self.unary(func, args, |x| -x),
            "+" => self.fold(func, args, 1, |a, b| a + b),
            "-" => self.fold(func, args, 2, |a, b| a - b),
            "*" => self.fold(func, args, 1, |a, b| a * b),
            "/" => self.fold(func, args, 2, |a, b| a / b),
            "&" => self.fold(func, args, 2, |a, b| truth(a != 0.0 && b != 0.0)),
            "|" => self.fold(func, args, 2, |a, b| truth(a != 0.0 || b != 0.0)),
            "**" => self.pair(func, args, f64::powf),
            "<" => self.pair(func, args, |a, b| truth(a < b)),
            "<=" => self.pair(func, args, |a, b| truth(a <= b)),
            ">" => self.pair(func, args, |a, b| truth(a > b)),
            ">=" => self.pair(func, args, |a, b| truth(a >= b)),
            "==" => self.pair(func, args, |a, b| truth(a == b)),
            "!=" => self.pair(func, args, |a, b| truth(a != b)),
            _ => Err(CalcError::UnknownFunction(func.to_owned())),
        }
    }

    /// `(read i)`, `(read i j)`, `(read i j dtype)`.
    fn read(&self, args: &[Expr]) -> Result<Value, CalcError> {
        arity("read", args, 1, 3, "1 to 3")?;
        let index = self.index_arg("read", &args[0])?;
        let mut value = Value::Array(self.input(index)?.clone().into_dyn());
        if let Some(band) = args.get(1) {
            let band = self.index_arg("read", band)?;
            value = take(value, band)?;
        }
        if let Some(dtype) = args.get(2) {
            let Value::Str(name) = self.eval(dtype)? else {
                return Err(CalcError::Type {
                    func: "read".to_owned(),
                    expected: "a dtype name as third argument",
                });
            };
            let dtype = DataType::from_name(&name).ok_or(CalcError::Dtype(name))?;
            if let Value::Array(a) = value {
                value = Value::Array(a.mapv(|v| cast_through(v, dtype)));
            }
        }
        Ok(value)
    }

    /// Data of the 1-based input `index`.
    fn input(&self, index: usize) -> Result<&Array3<f64>, CalcError> {
        self.inputs
            .get(index - 1)
            .map(|input| &input.data)
            .ok_or(CalcError::InputIndex {
                index,
                count: self.inputs.len(),
            })
    }

    /// An input given by 1-based index or by name, as a 3-D array.
    fn dataset_arg(&self, func: &str, expr: &Expr) -> Result<Value, CalcError> {
        match self.eval(expr)? {
            Value::Scalar(n) if n >= 1.0 && n.fract() == 0.0 => {
                Ok(Value::Array(self.input(n as usize)?.clone().into_dyn()))
            }
            Value::Array(a) if a.ndim() == 3 => Ok(Value::Array(a)),
            _ => Err(CalcError::Type {
                func: func.to_owned(),
                expected: "an input index or name",
            }),
        }
    }

    /// Optional numeric argument at `pos`.
    fn number_arg(
        &self,
        func: &str,
        args: &[Expr],
        pos: usize,
        default: f64,
    ) -> Result<f64, CalcError> {
        match args.get(pos).map(|a| self.eval(a)).transpose()? {
            None => Ok(default),
            Some(Value::Scalar(n)) if n >= 0.0 => Ok(n),
            Some(_) => Err(CalcError::Type {
                func: func.to_owned(),
                expected: "non-negative numeric options",
            }),
        }
    }

    /// `(fillnodata arr [mask [max_search_distance [smoothing_iterations]]])`.
    fn fillnodata(&self, args: &[Expr]) -> Result<Value, CalcError> {
        const FUNC: &str = "fillnodata";
        arity(FUNC, args, 1, 4, "1 to 4")?;
        let image = array_arg(FUNC, self.eval(&args[0])?)?;
        let mask = args
            .get(1)
            .map(|m| self.eval(m).and_then(|v| array_arg(FUNC, v)))
            .transpose()?;
        let distance = self.number_arg(FUNC, args, 2, 100.0)?;
        let smoothing = self.number_arg(FUNC, args, 3, 0.0)? as u32;

        let filled = map_bands(FUNC, &image, |i, band| {
            let mask = mask.as_ref().map(|m| mask_for_band(m, i, band.dim())).transpose()?;
            alg::fill_nodata(band, mask, distance, smoothing).map_err(|e| native(FUNC, &e))
        })?;
        Ok(Value::Array(filled))
    }

    /// `(sieve arr size [connectedness])`.
    fn sieve(&self, args: &[Expr]) -> Result<Value, CalcError> {
        const FUNC: &str = "sieve";
        arity(FUNC, args, 2, 3, "2 or 3")?;
        let image = array_arg(FUNC, self.eval(&args[0])?)?;
        let size = self.number_arg(FUNC, args, 1, 0.0)? as usize;
        let connectedness = match self.number_arg(FUNC, args, 2, 4.0)? {
            c if c == 4.0 => 4,
            c if c == 8.0 => 8,
            _ => {
                return Err(CalcError::Type {
                    func: FUNC.to_owned(),
                    expected: "a connectedness of 4 or 8",
                });
            }
        };

        let sieved = map_bands(FUNC, &image, |_, band| {
            alg::sieve(band, size, connectedness).map_err(|e| native(FUNC, &e))
        })?;
        Ok(Value::Array(sieved))
    }

    /// A 1-based positive integer argument.
    fn index_arg(&self, func: &str, expr: &Expr) -> Result<usize, CalcError> {
        match self.eval(expr)? {
            Value::Scalar(n) if n >= 1.0 && n.fract() == 0.0 => Ok(n as usize),
            _ => Err(CalcError::Type {
                func: func.to_owned(),
                expected: "a positive integer index",
            }),
        }
    }

    fn eval_all(&self, args: &[Expr]) -> Result<Vec<Value>, CalcError> {
        args.iter().map(|a| self.eval(a)).collect()
    }

    fn unary(&self, func: &str, args: &[Expr], op: fn(f64) -> f64) -> Result<Value, CalcError> {
        arity(func, args, 1, 1, "1")?;
        match self.eval(&args[0])? {
            Value::Scalar(x) => Ok(Value::Scalar(op(x))),
            Value::Array(a) => Ok(Value::Array(a.mapv(op))),
            Value::Str(_) => Err(numeric_expected(func)),
        }
    }

    fn pair(&self, func: &str, args: &[Expr], op: fn(f64, f64) -> f64) -> Result<Value, CalcError> {
        arity(func, args, 2, 2, "2")?;
        let a = self.eval(&args[0])?;
        let b = self.eval(&args[1])?;
        binary(func, a, b, op)
    }

    fn fold(
        &self,
        func: &str,
        args: &[Expr],
        min: usize,
        op: fn(f64, f64) -> f64,
    ) -> Result<Value, CalcError> {
        arity(func, args, min, usize::MAX, if min == 1 { "at least 1" } else { "at least 2" })?;
        let mut values = self.eval_all(args)?.into_iter();
        let first = values.next().ok_or_else(|| numeric_expected(func))?;
        if let Value::Str(_) = first {
            return Err(numeric_expected(func));
        }
        values.try_fold(first, |acc, v| binary(func, acc, v, op))
    }
}

fn arity(
    func: &str,
    args: &[Expr],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), CalcError> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(CalcError::Arity {
            func: func.to_owned(),
            expected,
            got: args.len(),
        })
    }
}

fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn numeric_expected(func: &str) -> CalcError {
    CalcError::Type {
        func: func.to_owned(),
        expected: "numeric arguments",
    }
}

fn native(func: &'static str, err: &impl std::fmt::Display) -> CalcError {
    CalcError::Native {
        func,
        message: err.to_string(),
    }
}

fn array_arg(func: &str, value: Value) -> Result<ArrayD<f64>, CalcError> {
    match value {
        Value::Array(a) => Ok(a),
        _ => Err(CalcError::Type {
            func: func.to_owned(),
            expected: "an array",
        }),
    }
}

/// Apply a 2-D operation to a 2-D array, or band by band to a 3-D one.
fn map_bands<F>(func: &str, array: &ArrayD<f64>, mut op: F) -> Result<ArrayD<f64>, CalcError>
where
    F: FnMut(usize, ArrayView2<'_, f64>) -> Result<Array2<f64>, CalcError>,
{
    let dims_error = || CalcError::Type {
        func: func.to_owned(),
        expected: "a 2-D or 3-D array",
    };
    match array.ndim() {
        2 => {
            let band = array.view().into_dimensionality::<Ix2>().map_err(|_| dims_error())?;
            Ok(op(0, band)?.into_dyn())
        }
        3 => {
            let bands = array.view().into_dimensionality::<Ix3>().map_err(|_| dims_error())?;
            let out = bands
                .outer_iter()
                .enumerate()
                .map(|(i, band)| op(i, band))
                .collect::<Result<Vec<_>, _>>()?;
            let views: Vec<ArrayView2<'_, f64>> = out.iter().map(Array2::view).collect();
            ndarray::stack(Axis(0), &views)
                .map(ndarray::ArrayBase::into_dyn)
                .map_err(|_| dims_error())
        }
        _ => Err(dims_error()),
    }
}

/// The 2-D mask for band `i`: a 2-D mask applies to every band, a 3-D mask
/// is indexed by band.
fn mask_for_band(
    mask: &ArrayD<f64>,
    i: usize,
    dim: (usize, usize),
) -> Result<ArrayView2<'_, f64>, CalcError> {
    let view = match mask.ndim() {
        3 if i < mask.len_of(Axis(0)) => mask.index_axis(Axis(0), i),
        3 => {
            return Err(CalcError::BandIndex {
                index: i + 1,
                count: mask.len_of(Axis(0)),
            });
        }
        _ => mask.view(),
    };
    view.into_dimensionality::<Ix2>()
        .ok()
        .filter(|m| m.dim() == dim)
        .ok_or_else(|| CalcError::Shape {
            left: mask.shape().to_vec(),
            right: vec![dim.0, dim.1],
        })
}

/// Select along the first axis (1-based), as `take` does.
fn take(value: Value, index: usize) -> Result<Value, CalcError> {
    let Value::Array(a) = value else {
        return Err(CalcError::Type {
            func: "take".to_owned(),
            expected: "an array",
        });
    };
    let count = a.len_of(Axis(0));
    if index == 0 || index > count {
        return Err(CalcError::BandIndex { index, count });
    }
    Ok(Value::Array(a.index_axis(Axis(0), index - 1).to_owned()))
}

/// Stack equally shaped arrays along a new first axis.
fn asarray(values: Vec<Value>) -> Result<Value, CalcError> {
    let arrays: Vec<ArrayD<f64>> = values
        .into_iter()
        .map(|v| match v {
            Value::Array(a) => Ok(a),
            _ => Err(CalcError::Type {
                func: "asarray".to_owned(),
                expected: "array arguments",
            }),
        })
        .collect::<Result<_, _>>()?;

    let views: Vec<ArrayViewD<'_, f64>> = arrays.iter().map(ArrayD::view).collect();
    ndarray::stack(Axis(0), &views)
        .map(Value::Array)
        .map_err(|_| CalcError::Shape {
            left: arrays[0].shape().to_vec(),
            right: arrays
                .iter()
                .find(|a| a.shape() != arrays[0].shape())
                .map(|a| a.shape().to_vec())
                .unwrap_or_default(),
        })
}

/// Result shape of broadcasting `a` against `b`, NumPy rules.
fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let n = a.len().max(b.len());
    let dim = |s: &[usize], i: usize| {
        let offset = n - s.len();
        if i < offset { 1 } else { s[i - offset] }
    };
    (0..n)
        .map(|i| match (dim(a, i), dim(b, i)) {
            (x, y) if x == y => Some(x),
            (1, y) => Some(y),
            (x, 1) => Some(x),
            _ => None,
        })
        .collect()
}

fn broadcast_to<'a>(
    a: &'a ArrayD<f64>,
    shape: &[usize],
) -> Result<ArrayViewD<'a, f64>, CalcError> {
    a.broadcast(IxDyn(shape)).ok_or_else(|| CalcError::Shape {
        left: a.shape().to_vec(),
        right: shape.to_vec(),
    })
}

fn binary(func: &str, a: Value, b: Value, op: fn(f64, f64) -> f64) -> Result<Value, CalcError> {
    match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => Ok(Value::Scalar(op(x, y))),
        (Value::Array(a), Value::Scalar(y)) => Ok(Value::Array(a.mapv(|x| op(x, y)))),
        (Value::Scalar(x), Value::Array(b)) => Ok(Value::Array(b.mapv(|y| op(x, y)))),
        (Value::Array(a), Value::Array(b)) => {
            let shape = broadcast_shape(a.shape(), b.shape()).ok_or_else(|| CalcError::Shape {
                left: a.shape().to_vec(),
                right: b.shape().to_vec(),
            })?;
            let av = broadcast_to(&a, &shape)?;
            let bv = broadcast_to(&b, &shape)?;
            Ok(Value::Array(Zip::from(av).and(bv).map_collect(|&x, &y| op(x, y))))
        }
        _ => Err(numeric_expected(func)),
    }
}

fn to_array(value: Value) -> Result<ArrayD<f64>, CalcError> {
    match value {
        Value::Scalar(x) => Ok(ArrayD::from_elem(IxDyn(&[]), x)),
        Value::Array(a) => Ok(a),
        Value::Str(_) => Err(numeric_expected("where")),
    }
}

/// Element-wise `cond ? a : b` with broadcasting.
fn select(cond: Value, a: Value, b: Value) -> Result<Value, CalcError> {
    let (cond, a, b) = (to_array(cond)?, to_array(a)?, to_array(b)?);
    let shape = broadcast_shape(cond.shape(), a.shape())
        .and_then(|s| broadcast_shape(&s, b.shape()))
        .ok_or_else(|| CalcError::Shape {
            left: cond.shape().to_vec(),
            right: a.shape().to_vec(),
        })?;
    let out = Zip::from(broadcast_to(&cond, &shape)?)
        .and(broadcast_to(&a, &shape)?)
        .and(broadcast_to(&b, &shape)?)
        .map_collect(|&c, &x, &y| if c != 0.0 { x } else { y });
    if out.ndim() == 0 {
        return Ok(Value::Scalar(out.iter().next().copied().unwrap_or(f64::NAN)));
    }
    Ok(Value::Array(out))
}

/// Turn an evaluation result into output bands: 3-D as is, 2-D as one band.
///
/// # Errors
///
/// Returns `CalcError::Result` for scalars, strings and other dimensions.
pub fn into_bands(value: Value) -> Result<Array3<f64>, CalcError> {
    let array = match value {
        Value::Array(a) if a.ndim() == 2 => a.insert_axis(Axis(0)),
        Value::Array(a) if a.ndim() == 3 => a,
        other => return Err(CalcError::Result(other.kind())),
    };
    array
        .into_dimensionality::<Ix3>()
        .map_err(|e| CalcError::Result(e.to_string()))
}
