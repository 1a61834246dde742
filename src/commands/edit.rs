/// `edit` command: validate requested metadata changes, then write them in place.
use crate::cli::OutputCtx;
use crate::cli::args::EditArgs;
use crate::raster::dtype::parse_nodata;
use crate::raster::{
    CrsEdit, CrsSpec, MetadataEdit, NodataEdit, RasterError, dataset, parse_transform,
};

/// Run `rasmeta edit`.
///
/// # Errors
///
/// Returns `RasterError::BadParameter` for any invalid option value (nothing
/// is written), or an open/GDAL error from the dataset itself.
pub fn run(args: &EditArgs, ctx: &OutputCtx) -> Result<(), RasterError> {
    let edit = build_edit(args)?;
    if edit.is_empty() {
        tracing::warn!(path = %args.input.display(), "no changes requested");
    }

    let _t = ctx.timer("apply_edit");
    dataset::apply_edit(&args.input, &edit)
}

/// Parse and normalize every option value into a single edit.
///
/// # Errors
///
/// Returns `RasterError::BadParameter` naming the first invalid option.
pub fn build_edit(args: &EditArgs) -> Result<MetadataEdit, RasterError> {
    let nodata = match (&args.nodata, args.unset_nodata) {
        (Some(raw), _) => Some(NodataEdit::Set(parse_nodata(raw)?)),
        (None, true) => Some(NodataEdit::Unset),
        (None, false) => None,
    };

    let crs = match (&args.crs, args.unset_crs) {
        (Some(raw), _) => Some(CrsEdit::Set(CrsSpec::parse(raw)?)),
        (None, true) => Some(CrsEdit::Unset),
        (None, false) => None,
    };

    let transform = args.transform.as_deref().map(parse_transform).transpose()?;
    let tags = dataset::parse_tags(&args.tags)?;

    Ok(MetadataEdit {
        nodata,
        crs,
        transform,
        tags,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn args() -> EditArgs {
        EditArgs {
            input: PathBuf::from("in.tif"),
            nodata: None,
            unset_nodata: false,
            crs: None,
            unset_crs: false,
            transform: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_empty_edit() {
        assert!(build_edit(&args()).unwrap().is_empty());
    }

    #[test]
    fn test_full_edit() {
        let edit = build_edit(&EditArgs {
            nodata: Some("255".to_owned()),
            crs: Some("+init=epsg:32618".to_owned()),
            transform: Some("[101985.0, 300.038, 0.0, 2826915.0, 0.0, -300.042]".to_owned()),
            tags: vec!["lol=1".to_owned()],
            ..args()
        })
        .unwrap();
        assert_eq!(edit.nodata, Some(NodataEdit::Set(255.0)));
        assert_eq!(
            edit.crs,
            Some(CrsEdit::Set(CrsSpec::Authority {
                name: "EPSG".to_owned(),
                code: "32618".to_owned()
            }))
        );
        let t = edit.transform.unwrap();
        assert_eq!((t.a, t.c, t.e, t.f), (300.038, 101_985.0, -300.042, 2_826_915.0));
        assert_eq!(edit.tags.len(), 1);
    }

    #[test]
    fn test_unset_flags() {
        let edit = build_edit(&EditArgs {
            unset_nodata: true,
            unset_crs: true,
            ..args()
        })
        .unwrap();
        assert_eq!(edit.nodata, Some(NodataEdit::Unset));
        assert_eq!(edit.crs, Some(CrsEdit::Unset));
    }

    #[test]
    fn test_invalid_values_exit_2() {
        for bad in [
            EditArgs {
                nodata: Some("lol".to_owned()),
                ..args()
            },
            EditArgs {
                crs: Some("LOL:WUT".to_owned()),
                ..args()
            },
            EditArgs {
                transform: Some("LOL".to_owned()),
                ..args()
            },
            EditArgs {
                transform: Some("[1,2]".to_owned()),
                ..args()
            },
            EditArgs {
                tags: vec!["novalue".to_owned()],
                ..args()
            },
        ] {
            assert_eq!(build_edit(&bad).unwrap_err().exit_code(), 2);
        }
    }
}
