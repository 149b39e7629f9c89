//! End to end tests against a small database written to a temp directory

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use uds_decoder::container::write_container;
use uds_decoder::fixed::FIXED_CONVERTERS;
use uds_decoder::{ParseInfo, ReaderConfig, SegmentType, UdsError, UdsReader};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn segment(name: &str, lines: &[&str]) -> String {
    let mut text = format!("[{}]\n", name);
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text.push_str(&format!("[/{}]\n", name));
    text
}

fn write(dir: &Path, file: &str, text: &str) {
    write_container(&dir.join(file), text).unwrap();
}

/// Minimal database with one measurement block per decode kind of interest
fn build_database() -> TempDir {
    let dir = TempDir::new().unwrap();
    let path = dir.path();

    write(path, "ReDir.uds", &segment("DIR", &["1,EV_ALIAS,EV_TEST", "2,EV_NODATA,EMPTY"]));
    write(
        path,
        "TTTextEN.uds",
        &segment("TXT", &["12,RPM,Drehzahl", "20,Coolant", "40,Off", "41,On", "3455,Unknown"]),
    );
    write(path, "UnitEN.uds", &segment("UNT", &["50,rpm", "3,°C"]));
    write(path, "TTDOP.uds", &segment("DOP", &["7,0,0,40,x", "7,1,1,41,x"]));
    write(
        path,
        "MUX.uds",
        &segment(
            "MUX",
            &["5,,,,,1,1,,2,,,,3,,,8,", "5,,,,,D,D,,7,,,,,,,,"],
        ),
    );
    write(path, "Chassis.ldat", "5G,VW37\n1K,XX00\n");

    write(path, "RA.uds", &segment("ADP", &["adaptation,one"]));
    write(path, "RD.uds", &segment("DTC", &[]));
    write(path, "RF.uds", &segment("FFMUX", &[]));
    write(path, "RG.uds", &segment("GES", &[]));
    write(
        path,
        "RM.uds",
        &segment(
            "MWB",
            &[
                // float scaled, mult 0.25, unit rpm, 16 bits
                "12,1,,0,0.25,,,50,0,0,16,,,",
                // enumeration group 7, 8 bits
                "20,2,7,3,,,,0,0,0,8,,,",
                // fixed converter 5
                "20,3,,4,5,,,0,,,,,,",
                // multiplexer group 5
                "20,4,5,6,,,,0,,,,,,",
                // name key without text
                "999,5,,7,,,,0,,,,,,",
            ],
        ),
    );
    write(path, "RS.uds", &segment("SOT", &[]));
    write(path, "RX.uds", &segment("XPL", &[]));

    write(
        path,
        "EV_TEST.uds",
        &(segment("MWB", &["1,0", "2,0", "3,0", "4,0"]) + &segment("INC", &["1,EV_TESTX"])),
    );
    write(path, "EV_TESTX.uds", &segment("MWB", &["1,0"]));
    write(path, "EV_BAD.uds", &segment("MWB", &["5,0"]));
    write(path, "EV_RANGE.uds", &segment("MWB", &["6,0"]));
    write(path, "EV_ADP.uds", &segment("ADP", &["1,0"]));

    dir
}

fn mwb_entries(reader: &UdsReader, name: &str) -> Vec<uds_decoder::MwbInfo> {
    reader
        .parse_file(name, SegmentType::Mwb)
        .unwrap()
        .into_iter()
        .filter_map(|info| match info {
            ParseInfo::Mwb(mwb) => Some(mwb),
            ParseInfo::Base(_) => None,
        })
        .collect()
}

#[test]
fn test_load_database() {
    init_logging();
    let dir = build_database();
    let reader = UdsReader::open(dir.path()).unwrap();
    let stats = reader.stats();

    assert_eq!(stats.num_texts, 5);
    assert_eq!(stats.num_units, 2);
    assert_eq!(stats.num_value_name_groups, 1);
    assert_eq!(stats.num_mux_groups, 1);
    assert_eq!(stats.num_redirects, 2);
    assert_eq!(stats.master_rows[&SegmentType::Mwb], 5);
    assert_eq!(stats.master_rows[&SegmentType::Adp], 1);
    assert_eq!(stats.master_rows[&SegmentType::Dtc], 0);
    assert!(stats.num_fixed_converters > 100);

    assert_eq!(reader.chassis_type("5G"), Some("VW37"));
    // built-in codes win over the chassis file
    assert_eq!(reader.chassis_type("1K"), Some("VW36"));
    assert_eq!(reader.tables().text(12), Some("RPM"));
}

#[test]
fn test_decode_measurement_blocks() {
    init_logging();
    let dir = build_database();
    let reader = UdsReader::open(dir.path()).unwrap();

    let entries = mwb_entries(&reader, "EV_TEST");
    // four own rows plus one from the include file
    assert_eq!(entries.len(), 5);

    let rpm = &entries[0];
    assert_eq!(rpm.display_name(), "RPM");
    assert_eq!(rpm.service_id, 1);
    assert_eq!(reader.decode(&rpm.data_type, &[0x00, 0x64]), "25 rpm");
    assert_eq!(reader.decode(&rpm.data_type, &[0x00]), "");

    let state = &entries[1].data_type;
    assert_eq!(reader.decode(state, &[0x01]), "On");
    assert_eq!(reader.decode(state, &[0x05]), "Unknown: 5");

    let coolant = &entries[2].data_type;
    assert_eq!(reader.decode(coolant, &[0x28]), "0 °C");
    assert_eq!(reader.decode(coolant, &[0x00]), "-40 °C");

    let mux = &entries[3].data_type;
    assert_eq!(reader.decode(mux, &[0x01]), "1 °C");
    assert_eq!(reader.decode(mux, &[0x02]), "02");

    assert_eq!(entries[4].service_id, 1);
}

#[test]
fn test_redirected_name() {
    let dir = build_database();
    let reader = UdsReader::open(dir.path()).unwrap();

    let files = reader.file_list("EV_ALIAS").unwrap();
    assert_eq!(files, vec![dir.path().join("EV_TEST.uds"), dir.path().join("EV_TESTX.uds")]);
    assert_eq!(mwb_entries(&reader, "EV_ALIAS").len(), 5);

    assert!(matches!(reader.file_list("EV_NODATA"), Err(UdsError::FileNotFound(_))));
}

#[test]
fn test_base_segment_rows() {
    let dir = build_database();
    let reader = UdsReader::open(dir.path()).unwrap();

    let rows = reader.parse_file("EV_ADP", SegmentType::Adp).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].row(), &vec!["adaptation".to_string(), "one".to_string()]);
}

#[test]
fn test_bad_rows_fail_only_their_call() {
    let dir = build_database();
    let reader = UdsReader::open(dir.path()).unwrap();

    assert!(matches!(
        reader.parse_file("EV_BAD", SegmentType::Mwb),
        Err(UdsError::TextNotFound(999))
    ));
    assert!(matches!(
        reader.parse_file("EV_RANGE", SegmentType::Mwb),
        Err(UdsError::IndexOutOfRange { index: 6, len: 5 })
    ));
    assert_eq!(mwb_entries(&reader, "EV_TEST").len(), 5);
}

#[test]
fn test_missing_table_fails_init() {
    let dir = build_database();
    std::fs::remove_file(dir.path().join("RX.uds")).unwrap();
    assert!(UdsReader::open(dir.path()).is_err());
}

#[test]
fn test_ambiguous_text_table_fails_init() {
    let dir = build_database();
    write(dir.path(), "TTTextDE.uds", &segment("TXT", &["12,Drehzahl"]));
    let err = UdsReader::open(dir.path()).unwrap_err();
    assert!(matches!(err, UdsError::AmbiguousFile { found: 2, .. }));
}

#[test]
fn test_strict_duplicate_keys() {
    let dir = build_database();
    write(dir.path(), "UnitEN.uds", &segment("UNT", &["50,rpm", "50,1/min", "3,°C"]));

    let reader = UdsReader::open(dir.path()).unwrap();
    assert_eq!(reader.tables().unit(50), Some("1/min"));

    let strict = ReaderConfig::new().with_reject_duplicate_keys(true);
    let err = UdsReader::init(dir.path(), strict).unwrap_err();
    assert!(matches!(err, UdsError::DuplicateKey { key: 50, .. }));
}

#[test]
fn test_fixed_types_dump() {
    let dir = build_database();
    let reader = UdsReader::open(dir.path()).unwrap();
    let dump = reader.test_fixed_types();

    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines.len(), FIXED_CONVERTERS.len());
    // ids without an encoding render nothing
    assert_eq!(lines[0], r#"1: "" "" "" "" "" """#);
    assert!(lines.iter().any(|line| line.starts_with("5: \"-24 °C\"")));
    assert_eq!(dump, reader.test_fixed_types());
}

#[test]
fn test_concurrent_decoding() {
    let dir = build_database();
    let reader = Arc::new(UdsReader::open(dir.path()).unwrap());
    let entry = mwb_entries(&reader, "EV_TEST").remove(0).data_type;

    std::thread::scope(|scope| {
        for value in 0..3u8 {
            let reader = Arc::clone(&reader);
            let entry = &entry;
            scope.spawn(move || {
                let expected = format!("{} rpm", u32::from(value) * 25);
                assert_eq!(reader.decode(entry, &[0x00, value * 100]), expected);
            });
        }
    });
}
