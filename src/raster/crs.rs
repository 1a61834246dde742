/// Coordinate reference system parsing and normalization.
///
/// A CRS may be given as an authority code (`EPSG:32618`), a PROJ string
/// (`+init=epsg:32618`, `+proj=utm +zone=18 +datum=WGS84`), a JSON object
/// (`{"init": "epsg:32618"}`), or WKT. All forms normalize to [`CrsSpec`];
/// `init=<auth>:<code>` references collapse to the authority form.
use std::fmt;

use gdal::spatial_ref::SpatialRef;
use serde_json::Value;

use super::errors::RasterError;

/// Authorities whose `NAME:CODE` references are passed on to GDAL.
const KNOWN_AUTHORITIES: &[&str] = &["EPSG", "ESRI", "OGC", "IAU_2015", "IGNF", "CRS"];

/// Leading keywords that mark a WKT definition.
const WKT_KEYWORDS: &[&str] = &[
    "GEOGCS[",
    "PROJCS[",
    "GEOCCS[",
    "COMPD_CS[",
    "LOCAL_CS[",
    "VERT_CS[",
    "GEOGCRS[",
    "GEODCRS[",
    "PROJCRS[",
    "COMPOUNDCRS[",
    "BOUNDCRS[",
    "VERTCRS[",
    "ENGCRS[",
];

/// A normalized coordinate reference system definition.
#[derive(Debug, Clone, PartialEq)]
pub enum CrsSpec {
    /// `NAME:CODE`, with the authority name upper-cased.
    Authority { name: String, code: String },
    /// PROJ parameters in input order; flags carry no value.
    Proj(Vec<(String, Option<String>)>),
    /// A WKT definition, passed through verbatim.
    Wkt(String),
}

impl CrsSpec {
    /// Parse any accepted CRS form. JSON is tried first, then the string forms.
    ///
    /// # Errors
    ///
    /// Returns `RasterError::BadParameter` when the input matches no form.
    pub fn parse(input: &str) -> Result<Self, RasterError> {
        let trimmed = input.trim();
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => Self::from_mapping(&map).ok_or_else(|| unrecognized(input)),
            Ok(Value::String(s)) => Self::from_text(&s).ok_or_else(|| unrecognized(input)),
            Ok(_) => Err(unrecognized(input)),
            Err(_) => Self::from_text(trimmed).ok_or_else(|| unrecognized(input)),
        }
    }

    fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if text.starts_with('+') {
            return Self::from_proj_string(text);
        }
        let upper = text.to_ascii_uppercase();
        if WKT_KEYWORDS.iter().any(|k| upper.starts_with(k)) {
            return Some(Self::Wkt(text.to_owned()));
        }
        parse_authority(text)
    }

    fn from_proj_string(text: &str) -> Option<Self> {
        let mut params = Vec::new();
        for token in text.split_whitespace() {
            let token = token.strip_prefix('+')?;
            if token.is_empty() {
                return None;
            }
            match token.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    params.push((key.to_owned(), Some(value.to_owned())));
                }
                Some(_) => return None,
                None => params.push((token.to_owned(), None)),
            }
        }
        Self::from_params(params)
    }

    fn from_mapping(map: &serde_json::Map<String, Value>) -> Option<Self> {
        let mut params = Vec::with_capacity(map.len());
        for (key, value) in map {
            let value = match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(true) | Value::Null => None,
                Value::Bool(false) => continue,
                Value::Array(_) | Value::Object(_) => return None,
            };
            params.push((key.clone(), value));
        }
        Self::from_params(params)
    }

    /// Collapse `init=<auth>:<code>` (optionally with `no_defs`) to an authority.
    fn from_params(params: Vec<(String, Option<String>)>) -> Option<Self> {
        if params.is_empty() {
            return None;
        }
        let meaningful: Vec<&(String, Option<String>)> =
            params.iter().filter(|(k, _)| k != "no_defs" && k != "wktext").collect();
        if let [(key, Some(value))] = meaningful.as_slice() {
            if key == "init" {
                return parse_authority(value);
            }
        }
        if params.iter().any(|(k, _)| k == "init") {
            // init mixed with other parameters cannot be expressed canonically.
            return None;
        }
        Some(Self::Proj(params))
    }

    /// The canonical definition string handed to GDAL.
    #[must_use]
    pub fn definition(&self) -> String {
        self.to_string()
    }

    /// Resolve through GDAL.
    ///
    /// # Errors
    ///
    /// Returns `RasterError::BadParameter` when GDAL does not recognize the definition.
    pub fn to_spatial_ref(&self) -> Result<SpatialRef, RasterError> {
        let definition = self.definition();
        SpatialRef::from_definition(&definition).map_err(|e| {
            tracing::debug!(%definition, error = %e, "GDAL rejected CRS definition");
            unrecognized(&definition)
        })
    }
}

impl fmt::Display for CrsSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authority { name, code } => write!(f, "{name}:{code}"),
            Self::Proj(params) => {
                let parts: Vec<String> = params
                    .iter()
                    .map(|(k, v)| match v {
                        Some(v) => format!("+{k}={v}"),
                        None => format!("+{k}"),
                    })
                    .collect();
                write!(f, "{}", parts.join(" "))
            }
            Self::Wkt(wkt) => write!(f, "{wkt}"),
        }
    }
}

fn parse_authority(text: &str) -> Option<CrsSpec> {
    let (name, code) = text.split_once(':')?;
    let name = name.trim().to_ascii_uppercase();
    let code = code.trim();
    if !KNOWN_AUTHORITIES.contains(&name.as_str()) {
        return None;
    }
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(CrsSpec::Authority {
        name,
        code: code.to_owned(),
    })
}

fn unrecognized(input: &str) -> RasterError {
    RasterError::bad_parameter("crs", format!("'{input}' is not a recognized CRS"))
}

/// Format a CRS read back from a dataset the way `info` reports it.
///
/// Authority-backed CRSs print as `NAME:CODE`; others as a PROJ string, with a
/// leading `+init=epsg:N` upper-cased to `EPSG:N`.
#[must_use]
pub fn describe(authority: Option<(&str, &str)>, proj4: &str) -> String {
    if let Some((name, code)) = authority {
        return format!("{}:{code}", name.to_ascii_uppercase());
    }
    let proj4 = proj4.trim();
    match proj4.strip_prefix("+init=") {
        Some(rest) if rest.to_ascii_lowercase().starts_with("epsg:") => {
            rest.split_whitespace().next().unwrap_or(rest).to_ascii_uppercase()
        }
        _ => proj4.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epsg(code: &str) -> CrsSpec {
        CrsSpec::Authority {
            name: "EPSG".to_owned(),
            code: code.to_owned(),
        }
    }

    #[test]
    fn test_authority_code() {
        assert_eq!(CrsSpec::parse("EPSG:32618").unwrap(), epsg("32618"));
        assert_eq!(CrsSpec::parse("epsg:4326").unwrap(), epsg("4326"));
    }

    #[test]
    fn test_proj_init_normalizes_to_authority() {
        assert_eq!(CrsSpec::parse("+init=epsg:32618").unwrap(), epsg("32618"));
        assert_eq!(CrsSpec::parse("+init=epsg:32618 +no_defs").unwrap(), epsg("32618"));
    }

    #[test]
    fn test_json_init_normalizes_to_authority() {
        assert_eq!(CrsSpec::parse(r#"{"init": "epsg:32618"}"#).unwrap(), epsg("32618"));
    }

    #[test]
    fn test_all_forms_share_one_definition() {
        let forms = ["EPSG:32618", "+init=epsg:32618", r#"{"init": "epsg:32618"}"#];
        for form in forms {
            assert_eq!(CrsSpec::parse(form).unwrap().definition(), "EPSG:32618");
        }
    }

    #[test]
    fn test_proj_string_keeps_parameter_order() {
        let crs = CrsSpec::parse("+proj=utm +zone=18 +datum=WGS84 +units=m +no_defs").unwrap();
        assert_eq!(crs.definition(), "+proj=utm +zone=18 +datum=WGS84 +units=m +no_defs");
    }

    #[test]
    fn test_json_mapping_to_proj() {
        let crs = CrsSpec::parse(r#"{"proj": "utm", "zone": 18, "north": true}"#).unwrap();
        let def = crs.definition();
        assert!(def.contains("+proj=utm"));
        assert!(def.contains("+zone=18"));
        assert!(def.contains("+north"));
    }

    #[test]
    fn test_wkt_passthrough() {
        let wkt = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]]]"#;
        assert_eq!(CrsSpec::parse(wkt).unwrap(), CrsSpec::Wkt(wkt.to_owned()));
    }

    #[test]
    fn test_rejects_unknown_forms() {
        for bad in [
            "LOL:WUT",
            "EPSG:",
            "EPSG:12 34",
            "",
            "lol",
            "+",
            "+=3",
            "[1, 2]",
            "42",
            "{}",
            r#"{"init": "lol:wut"}"#,
        ] {
            let err = CrsSpec::parse(bad).unwrap_err();
            assert_eq!(err.exit_code(), 2, "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(Some(("EPSG", "32618")), ""),
            "EPSG:32618"
        );
        assert_eq!(describe(None, "+init=epsg:32618"), "EPSG:32618");
        assert_eq!(
            describe(None, "+proj=longlat +datum=WGS84 +no_defs "),
            "+proj=longlat +datum=WGS84 +no_defs"
        );
        assert_eq!(describe(None, ""), "");
    }
}
