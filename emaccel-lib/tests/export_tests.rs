//! CSV export of decoded data points

use emaccel_lib::export::{export_to_dir, write_csv};
use emaccel_lib::{DataPoint, RawCapture};

#[test]
fn test_write_csv_layout() {
    let points = vec![
        DataPoint {
            time_micros: 0,
            states: [0, 0, 0, 0, 0, 0],
        },
        DataPoint {
            time_micros: 200,
            states: [1, 0, 0, 0, 0, 1],
        },
    ];

    let mut out = Vec::new();
    write_csv(&mut out, &points).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines,
        vec![
            "time / µs,accelerator 1,accelerator 2,accelerator 3,accelerator 4,accelerator 5,accelerator 6",
            "0,0,0,0,0,0,0",
            "200,1,0,0,0,0,1",
        ]
    );
}

#[test]
fn test_write_csv_header_only_for_empty_sequence() {
    let mut out = Vec::new();
    write_csv(&mut out, &[]).unwrap();
    assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
}

#[test]
fn test_capture_file_to_export() {
    let dir = std::env::temp_dir().join(format!("emaccel-export-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let capture_path = dir.join("capture.bin");
    RawCapture::new(&b"xx000000,1000\r\nxx000100,1250\r\nslf\r\n"[..])
        .save(&capture_path)
        .unwrap();

    let points = RawCapture::load(&capture_path).unwrap().into_data_points().unwrap();
    let path = export_to_dir(&dir, &points).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("results"));
    assert_eq!(text.lines().count(), 3);
    assert_eq!(text.lines().last(), Some("250,0,0,0,1,0,0"));

    std::fs::remove_dir_all(&dir).unwrap();
}
