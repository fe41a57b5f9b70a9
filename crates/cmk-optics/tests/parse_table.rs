use std::io::Write;

use cmk_core::{Beam, CmkError, Sector};
use cmk_optics::{sector_correctors, OpticsTable};

const SAMPLE: &str = r#"
@ NAME             %05s "TWISS"
@ SEQUENCE         %06s "LHCB1"
@ Q1               %le        62.31
@ Q2               %le        60.32
* NAME        S        BETX      BETY      MUX       MUY
$ %s          %le      %le       %le       %le       %le
 "MQS.23R1.B1"  150.0   56.2      61.9      0.51      0.46
 "MB.A12R1.B1"  180.0   95.0      88.0      0.62      0.55
 "MQS.27R1.B1"  210.0   48.7      70.3      1.13      1.05
 "MQS.27L2.B1"  260.0   63.4      55.1      1.78      1.64
 "MQS.23L2.B1"  310.0   71.8      49.6      2.41      2.22
"#;

#[test]
fn parses_headers_and_records() {
    let table = OpticsTable::from_str_content(SAMPLE).unwrap();
    assert_eq!(table.records().len(), 5);
    assert_eq!(table.header("SEQUENCE"), Some("LHCB1"));
    assert_eq!(table.numeric_header("Q1").unwrap(), Some(62.31));
    assert_eq!(table.numeric_header("QS").unwrap(), None);

    let first = &table.records()[0];
    assert_eq!(first.name, "MQS.23R1.B1");
    assert_eq!(first.betx, 56.2);
    assert_eq!(first.muy, 0.46);
}

#[test]
fn selects_sector_correctors_in_position_order() {
    let table = OpticsTable::from_str_content(SAMPLE).unwrap();
    let sector = Sector::from_index(1).unwrap();
    let samples = sector_correctors(&table, &sector, Beam::Beam1).unwrap();
    assert_eq!(samples.len(), 4);
    let names: Vec<&str> = samples.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["MQS.23R1.B1", "MQS.27R1.B1", "MQS.27L2.B1", "MQS.23L2.B1"]
    );
}

#[test]
fn wrong_sector_count_is_a_data_error() {
    let table = OpticsTable::from_str_content(SAMPLE).unwrap();
    let sector = Sector::from_index(5).unwrap();
    let err = sector_correctors(&table, &sector, Beam::Beam1).unwrap_err();
    match err {
        CmkError::Data(info) => {
            assert_eq!(info.code, "optics-corrector-count");
            assert_eq!(info.context.get("sector").unwrap(), "56");
            assert_eq!(info.context.get("found").unwrap(), "0");
        }
        other => panic!("expected data error, got {other:?}"),
    }
}

#[test]
fn missing_required_column_is_a_data_error() {
    let text = "* NAME S BETX BETY MUX\n MQS.23R1.B1 1.0 2.0 3.0 4.0\n";
    let err = OpticsTable::from_str_content(text).unwrap_err();
    assert_eq!(err.info().code, "optics-missing-columns");
    assert_eq!(err.info().context.get("missing").unwrap(), "MUY");
}

#[test]
fn data_row_before_columns_is_a_data_error() {
    let text = " MQS.23R1.B1 1.0 2.0 3.0 4.0 5.0\n";
    let err = OpticsTable::from_str_content(text).unwrap_err();
    assert_eq!(err.info().code, "optics-no-columns");
}

#[test]
fn non_numeric_field_is_a_data_error() {
    let text = "* NAME S BETX BETY MUX MUY\n MQS.23R1.B1 1.0 oops 3.0 4.0 5.0\n";
    let err = OpticsTable::from_str_content(text).unwrap_err();
    assert_eq!(err.info().code, "optics-bad-float");
    assert_eq!(err.info().context.get("column").unwrap(), "BETX");
}

#[test]
fn empty_table_is_a_data_error() {
    let text = "@ NAME %05s \"TWISS\"\n* NAME S BETX BETY MUX MUY\n";
    let err = OpticsTable::from_str_content(text).unwrap_err();
    assert_eq!(err.info().code, "optics-empty");
}

#[test]
fn reading_from_disk_records_a_content_digest() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();
    let table = OpticsTable::from_path(file.path()).unwrap();
    let digest = table.digest().expect("digest recorded");
    assert_eq!(digest.sha256.len(), 64);
    assert!(digest.sha256.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(digest.source, file.path().display().to_string());

    let missing = OpticsTable::from_path(std::path::Path::new("/nonexistent/optics.tfs"));
    assert_eq!(missing.unwrap_err().info().code, "optics-read");
}
