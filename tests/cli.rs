//! CLI integration tests: `info`, `edit`, `env` and `calc` against generated GeoTIFFs.

mod common;

use gdal::{Dataset, Metadata};
use predicates::prelude::*;

use common::{Fixture, GEO_TRANSFORM, rasmeta};

fn info_line(fixture: &Fixture, flag: &str) -> String {
    let output = rasmeta()
        .args(["info", fixture.path_str(), flag])
        .output()
        .expect("run rasmeta info");
    assert!(output.status.success(), "info {flag} failed: {output:?}");
    String::from_utf8(output.stdout).expect("stdout is UTF-8")
}

// ===== edit --nodata =====

#[test]
fn test_edit_nodata_out_of_range() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["edit", fixture.path_str(), "--nodata", "-1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--nodata"));
    assert_eq!(info_line(&fixture, "--nodata"), "0.0\n");
}

#[test]
fn test_edit_nodata_not_a_number() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["edit", fixture.path_str(), "--nodata", "lol"])
        .assert()
        .code(2);
}

#[test]
fn test_edit_nodata() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["edit", fixture.path_str(), "--nodata", "255"])
        .assert()
        .success();
    let ds = fixture.open().unwrap();
    for bidx in 1..=3 {
        assert_eq!(ds.rasterband(bidx).unwrap().no_data_value(), Some(255.0));
    }
}

#[test]
fn test_edit_unset_nodata() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["edit", fixture.path_str(), "--unset-nodata"])
        .assert()
        .success();
    assert_eq!(info_line(&fixture, "--nodata"), "\n");
}

#[test]
fn test_edit_nodata_uint64_upper_bound() {
    let fixture = Fixture::single_band::<u64>("u64.tif", 7).unwrap();
    rasmeta()
        .args(["edit", fixture.path_str(), "--nodata", "18446744073709551616"])
        .assert()
        .code(2);
    assert_eq!(band_nodata_u64(&fixture), None);

    rasmeta()
        .args(["edit", fixture.path_str(), "--nodata", "18446744073709549568"])
        .assert()
        .success();
    assert_eq!(band_nodata_u64(&fixture), Some(18_446_744_073_709_549_568));
}

#[test]
fn test_edit_nodata_int64_bounds() {
    let fixture = Fixture::single_band::<i64>("i64.tif", -7).unwrap();
    for value in ["9223372036854775808", "9223372036854775807", "-9223372036854777856"] {
        rasmeta()
            .args(["edit", fixture.path_str(), "--nodata", value])
            .assert()
            .code(2);
    }
    assert_eq!(band_nodata_i64(&fixture), None);

    rasmeta()
        .args(["edit", fixture.path_str(), "--nodata", "-9223372036854775808"])
        .assert()
        .success();
    assert_eq!(band_nodata_i64(&fixture), Some(i64::MIN));

    rasmeta()
        .args(["edit", fixture.path_str(), "--nodata", "255"])
        .assert()
        .success();
    assert_eq!(band_nodata_i64(&fixture), Some(255));
}

fn band_nodata_i64(fixture: &Fixture) -> Option<i64> {
    let ds = fixture.open().unwrap();
    let band = ds.rasterband(1).unwrap();
    let mut success = 0;
    // SAFETY: the band handle is valid while `ds` is alive.
    let value = unsafe { gdal_sys::GDALGetRasterNoDataValueAsInt64(band.c_rasterband(), &mut success) };
    (success != 0).then_some(value)
}

fn band_nodata_u64(fixture: &Fixture) -> Option<u64> {
    let ds = fixture.open().unwrap();
    let band = ds.rasterband(1).unwrap();
    let mut success = 0;
    // SAFETY: the band handle is valid while `ds` is alive.
    let value = unsafe { gdal_sys::GDALGetRasterNoDataValueAsUInt64(band.c_rasterband(), &mut success) };
    (success != 0).then_some(value)
}

// ===== edit --crs =====

#[test]
fn test_edit_crs_err() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["edit", fixture.path_str(), "--crs", "LOL:WUT"])
        .assert()
        .code(2);
    assert_eq!(info_line(&fixture, "--crs"), "EPSG:32618\n");
}

#[test]
fn test_edit_crs_rejected_by_gdal() {
    for crs in ["EPSG:0", "+proj=lol"] {
        let fixture = Fixture::rgb_byte().unwrap();
        rasmeta()
            .args(["edit", fixture.path_str(), "--crs", crs, "--nodata", "255"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("--crs"));
        assert_eq!(info_line(&fixture, "--crs"), "EPSG:32618\n", "crs {crs}");
        assert_eq!(info_line(&fixture, "--nodata"), "0.0\n", "crs {crs}");
    }
}

#[test]
fn test_edit_crs_forms() {
    for form in ["EPSG:32618", "+init=epsg:32618", r#"{"init": "epsg:32618"}"#] {
        let fixture = Fixture::rgb_byte().unwrap();
        rasmeta()
            .args(["edit", fixture.path_str(), "--crs", "EPSG:4326"])
            .assert()
            .success();
        assert_eq!(info_line(&fixture, "--crs"), "EPSG:4326\n");

        rasmeta()
            .args(["edit", fixture.path_str(), "--crs", form])
            .assert()
            .success();
        assert_eq!(info_line(&fixture, "--crs"), "EPSG:32618\n", "form {form}");
    }
}

#[test]
fn test_edit_unset_crs() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["edit", fixture.path_str(), "--unset-crs"])
        .assert()
        .success();
    assert_eq!(info_line(&fixture, "--crs"), "\n");
    assert_eq!(info_line(&fixture, "--lnglat"), "\n");
}

// ===== edit --transform =====

#[test]
fn test_edit_transform_err_not_json() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["edit", fixture.path_str(), "--transform", "LOL"])
        .assert()
        .code(2);
}

#[test]
fn test_edit_transform_err_bad_array() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["edit", fixture.path_str(), "--transform", "[1,2]"])
        .assert()
        .code(2);
    assert_eq!(fixture.open().unwrap().geo_transform().unwrap(), GEO_TRANSFORM);
}

#[test]
fn test_edit_transform_both_orders() {
    // Native order a b c d e f, stored by GDAL as c a b f d e.
    let expected = [101_985.0, 300.038, 0.0, 2_826_915.0, 0.0, -300.042];
    for input in [
        "[300.038, 0.0, 101985.0, 0.0, -300.042, 2826915.0]",
        "[101985.0, 300.038, 0.0, 2826915.0, 0.0, -300.042]",
    ] {
        let fixture = Fixture::rgb_byte().unwrap();
        rasmeta()
            .args(["edit", fixture.path_str(), "--transform", input])
            .assert()
            .success();
        let gt = fixture.open().unwrap().geo_transform().unwrap();
        for (a, b) in gt.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6, "{gt:?} != {expected:?}");
        }
    }
}

// ===== edit --tag =====

#[test]
fn test_edit_tags() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["edit", fixture.path_str(), "--tag", "lol=1", "--tag", "wut=2"])
        .assert()
        .success();
    let ds = fixture.open().unwrap();
    assert_eq!(ds.metadata_item("lol", "").as_deref(), Some("1"));
    assert_eq!(ds.metadata_item("wut", "").as_deref(), Some("2"));
}

#[test]
fn test_edit_tags_keep_key_verbatim() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["edit", fixture.path_str(), "--tag", " lol=1"])
        .assert()
        .success();
    let ds = fixture.open().unwrap();
    assert_eq!(ds.metadata_item(" lol", "").as_deref(), Some("1"));
}

#[test]
fn test_edit_bad_tag() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["edit", fixture.path_str(), "--tag", "novalue"])
        .assert()
        .code(2);
}

#[test]
fn test_edit_missing_file() {
    let fixture = Fixture::rgb_byte().unwrap();
    let missing = fixture.sibling("missing.tif");
    rasmeta()
        .args(["edit", missing.to_str().unwrap(), "--nodata", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}

// ===== env =====

#[test]
fn test_env_formats() {
    rasmeta()
        .args(["env", "--formats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GTiff"));
}

#[test]
fn test_env_formats_json() {
    rasmeta()
        .args(["--json", "env", "--formats"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["))
        .stdout(predicate::str::contains(r#""short_name": "GTiff""#));
}

#[test]
fn test_env_summary() {
    rasmeta()
        .args(["env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gdal_release: "));
}

// ===== info =====

#[test]
fn test_info_err() {
    let dir = tempfile::tempdir().unwrap();
    rasmeta()
        .args(["info", dir.path().to_str().unwrap()])
        .assert()
        .code(1);
}

#[test]
fn test_info_missing_path() {
    rasmeta()
        .args(["info", "definitely/not/here.tif"])
        .assert()
        .code(2);
}

#[test]
fn test_info() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["info", fixture.path_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""count": 3"#))
        .stdout(predicate::str::contains(r#""driver": "GTiff""#))
        .stdout(predicate::str::contains(r#""dtype": "uint8""#))
        .stdout(predicate::str::contains(r#""crs": "EPSG:32618""#))
        .stdout(predicate::str::contains(r#""res": [463.53515625, 420.76171875]"#))
        .stdout(predicate::str::contains(r#""lnglat": [-77.75"#));
}

#[test]
fn test_info_indent() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["info", fixture.path_str(), "--indent", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\n  \"count\": 3,\n"));
}

#[test]
fn test_info_verbose() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["-v", "info", fixture.path_str()])
        .assert()
        .success();
}

#[test]
fn test_info_quiet() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["-q", "info", fixture.path_str()])
        .assert()
        .success();
}

#[test]
fn test_info_count() {
    let fixture = Fixture::rgb_byte().unwrap();
    assert_eq!(info_line(&fixture, "--count"), "3\n");
}

#[test]
fn test_info_bounds() {
    let fixture = Fixture::rgb_byte().unwrap();
    assert_eq!(
        info_line(&fixture, "--bounds"),
        "101985.0 2611485.0 339315.0 2826915.0\n"
    );
}

#[test]
fn test_info_tags() {
    let fixture = Fixture::rgb_byte().unwrap();
    assert_eq!(info_line(&fixture, "--tags"), "{\"AREA_OR_POINT\": \"Area\"}\n");
}

#[test]
fn test_info_res() {
    let fixture = Fixture::rgb_byte().unwrap();
    assert_eq!(info_line(&fixture, "--res"), "463.53515625 420.76171875\n");
}

#[test]
fn test_info_lnglat() {
    let fixture = Fixture::rgb_byte().unwrap();
    assert!(info_line(&fixture, "--lnglat").starts_with("-77.75"));
}

#[test]
fn test_info_members() {
    let fixture = Fixture::rgb_byte().unwrap();
    assert_eq!(info_line(&fixture, "--dtype"), "uint8\n");
    assert_eq!(info_line(&fixture, "--driver"), "GTiff\n");
    assert_eq!(info_line(&fixture, "--shape"), "512 512\n");
    assert_eq!(info_line(&fixture, "--width"), "512\n");
}

#[test]
fn test_info_members_are_exclusive() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["info", fixture.path_str(), "--count", "--bounds"])
        .assert()
        .code(2);
}

#[test]
fn test_info_tell_me_more() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["info", fixture.path_str(), "--tell-me-more"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""max": 255.0"#))
        .stdout(predicate::str::contains(r#""min": 1.0"#))
        .stdout(predicate::str::contains(r#""mean": 128.0"#))
        .stdout(predicate::str::contains(r#""checksum": ["#));
}

#[test]
fn test_info_stats_only() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["info", fixture.path_str(), "--stats", "--bidx", "2"])
        .assert()
        .success()
        .stdout("1.000000 255.000000 128.000000\n");
}

#[test]
fn test_info_bidx_out_of_range() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["info", fixture.path_str(), "--stats", "--bidx", "4"])
        .assert()
        .code(2);
}

#[test]
fn test_info_ignores_bidx_without_band_reads() {
    let fixture = Fixture::rgb_byte().unwrap();
    rasmeta()
        .args(["info", fixture.path_str(), "--count", "--bidx", "9"])
        .assert()
        .success()
        .stdout("3\n");
}

#[test]
fn test_info_error_json_envelope() {
    rasmeta()
        .args(["--json", "info", "definitely/not/here.tif"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(r#""code": "path_not_found""#));
}

// ===== calc =====

#[test]
fn test_calc_scale_offset() {
    let fixture = Fixture::rgb_byte().unwrap();
    let out = fixture.sibling("out.tif");
    rasmeta()
        .args([
            "calc",
            "(+ 2 (* 0.5 (read 1 1)))",
            fixture.path_str(),
            out.to_str().unwrap(),
            "--dtype",
            "uint8",
        ])
        .assert()
        .success();

    let ds = Dataset::open(&out).unwrap();
    assert_eq!(ds.raster_count(), 1);
    assert_eq!(ds.geo_transform().unwrap(), GEO_TRANSFORM);
    let buffer = ds.rasterband(1).unwrap().read_band_as::<u8>().unwrap();
    // x = 10 -> 2 + 5; x = 255 -> 2 + 127.5 truncated
    assert_eq!(buffer.data()[10], 7);
    assert_eq!(buffer.data()[255], 129);
}

#[test]
fn test_calc_multiband_named() {
    let fixture = Fixture::rgb_byte().unwrap();
    let out = fixture.sibling("stack.tif");
    let named = format!("a={}", fixture.path_str());
    rasmeta()
        .args([
            "calc",
            "--name",
            &named,
            "(asarray (take a 1) (take a 2))",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let ds = Dataset::open(&out).unwrap();
    assert_eq!(ds.raster_count(), 2);
    let buffer = ds.rasterband(2).unwrap().read_band_as::<f64>().unwrap();
    assert_eq!(buffer.data()[3], 3.0);
}

#[test]
fn test_calc_bad_expression() {
    let fixture = Fixture::rgb_byte().unwrap();
    let out = fixture.sibling("bad.tif");
    rasmeta()
        .args(["calc", "(+ 1 (read 1)", fixture.path_str(), out.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Expression error"));
}

#[test]
fn test_calc_unknown_driver() {
    let fixture = Fixture::rgb_byte().unwrap();
    let out = fixture.sibling("out.tif");
    rasmeta()
        .args([
            "calc",
            "(read 1)",
            fixture.path_str(),
            out.to_str().unwrap(),
            "--driver",
            "GTif",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("GTiff"));
}

#[test]
fn test_calc_dtype_saturates() {
    let fixture = Fixture::rgb_byte().unwrap();
    let out = fixture.sibling("sat.tif");
    rasmeta()
        .args([
            "calc",
            "(* 300 (read 1 1))",
            fixture.path_str(),
            out.to_str().unwrap(),
            "--dtype",
            "uint8",
        ])
        .assert()
        .success();

    let ds = Dataset::open(&out).unwrap();
    let buffer = ds.rasterband(1).unwrap().read_band_as::<u8>().unwrap();
    assert_eq!(buffer.data()[0], 0);
    assert_eq!(buffer.data()[1], 255);
    assert_eq!(buffer.data()[200], 255);
}

#[test]
fn test_calc_uses_first_input_driver() {
    let fixture = Fixture::rgb_byte().unwrap();
    let out = fixture.sibling("copy.tif");
    rasmeta()
        .args(["calc", "(read 1)", fixture.path_str(), out.to_str().unwrap()])
        .assert()
        .success();
    let ds = Dataset::open(&out).unwrap();
    assert_eq!(ds.driver().short_name(), "GTiff");
    assert_eq!(ds.raster_count(), 3);
}

#[test]
fn test_calc_fillnodata_and_sieve() {
    let fixture = Fixture::rgb_byte().unwrap();
    let filled = fixture.sibling("filled.tif");
    rasmeta()
        .args([
            "calc",
            "(fillnodata (read 1 1) (!= (read 1 1) 0) 10)",
            fixture.path_str(),
            filled.to_str().unwrap(),
        ])
        .assert()
        .success();
    let ds = Dataset::open(&filled).unwrap();
    let buffer = ds.rasterband(1).unwrap().read_band_as::<f64>().unwrap();
    // columns 0 and 256 held zeros and are interpolated from their neighbours
    assert!(buffer.data()[0] > 0.0);
    assert!(buffer.data()[256] > 0.0);
    assert_eq!(buffer.data()[10], 10.0);

    let sieved = fixture.sibling("sieved.tif");
    rasmeta()
        .args([
            "calc",
            "(sieve (read 1 1) 4)",
            fixture.path_str(),
            sieved.to_str().unwrap(),
            "--dtype",
            "int32",
        ])
        .assert()
        .success();
    assert_eq!(Dataset::open(&sieved).unwrap().raster_count(), 1);
}

#[test]
fn test_calc_sieve_bad_connectedness() {
    let fixture = Fixture::rgb_byte().unwrap();
    let out = fixture.sibling("nope.tif");
    rasmeta()
        .args(["calc", "(sieve (read 1 1) 2 6)", fixture.path_str(), out.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("connectedness"));
}
