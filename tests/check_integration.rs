// Driver-level integration: discovery, two-pass indexing across
// files, stubs, and the metadata cache.

use std::fs;
use std::path::Path;

use civet::driver::{run_check, run_index, DriverOptions};

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn cross_file_symbols_resolve() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "lib.php",
        "class Greeter { public function hello($name){ return 'hi ' . $name; } }\n\
         function make_greeter(){ return new Greeter(); }\n",
    );
    write(
        dir.path(),
        "main.php",
        "function main(){ $g = make_greeter(); return $g->hello('world'); }\n",
    );

    let reports = run_check(&[dir.path().to_path_buf()], &DriverOptions::default()).unwrap();
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn undefined_cross_file_call_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.php", "function main(){ vanished(); }\n");

    let reports = run_check(&[dir.path().to_path_buf()], &DriverOptions::default()).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].check_name, "undefined");
    assert!(reports[0].message.contains("vanished"));
}

#[test]
fn stubs_define_builtins_without_reports() {
    let stubs = tempfile::tempdir().unwrap();
    write(
        stubs.path(),
        "core.php",
        "function strlen($s){ return 0; }\nfunction count($xs){ return 0; }\n",
    );
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "main.php",
        "function main($xs){ return strlen('x') + count($xs); }\n",
    );

    let options = DriverOptions {
        stubs_dir: Some(stubs.path().to_path_buf()),
        ..Default::default()
    };
    let reports = run_check(&[dir.path().to_path_buf()], &options).unwrap();
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn non_source_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "notes.txt", "not source at all {{{");
    write(dir.path(), "main.php", "function main(){ return 1; }\n");

    let reports = run_check(&[dir.path().to_path_buf()], &DriverOptions::default()).unwrap();
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn cache_survives_roundtrip_and_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "lib.php",
        "function helper(){ return 1; }\nfunction main(){ return helper(); }\n",
    );

    let indexed = run_index(
        &[dir.path().to_path_buf()],
        cache.path(),
        &DriverOptions::default(),
    )
    .unwrap();
    assert_eq!(indexed, 1);
    let cached: Vec<_> = fs::read_dir(cache.path()).unwrap().collect();
    assert_eq!(cached.len(), 1);

    // Warm run uses the cache.
    let options = DriverOptions {
        cache_dir: Some(cache.path().to_path_buf()),
        ..Default::default()
    };
    let reports = run_check(&[dir.path().to_path_buf()], &options).unwrap();
    assert!(reports.is_empty(), "got: {reports:?}");

    // Flip the version byte: decoding fails, the driver reparses.
    for entry in fs::read_dir(cache.path()).unwrap() {
        let path = entry.unwrap().path();
        let mut bytes = fs::read(&path).unwrap();
        bytes[0] = bytes[0].wrapping_add(1);
        fs::write(&path, bytes).unwrap();
    }
    let reports = run_check(&[dir.path().to_path_buf()], &options).unwrap();
    assert!(reports.is_empty(), "got: {reports:?}");
}

#[test]
fn deterministic_report_order_across_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.php", "function a(){ echo $one; }\n");
    write(dir.path(), "b.php", "function b(){ echo $two; }\n");

    let options = DriverOptions {
        workers: 4,
        ..Default::default()
    };
    let first = run_check(&[dir.path().to_path_buf()], &options).unwrap();
    let second = run_check(&[dir.path().to_path_buf()], &options).unwrap();
    let names = |reports: &[civet_linter::Report]| {
        reports
            .iter()
            .map(|r| (r.filename.clone(), r.message.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(names(&first), names(&second));
    assert_eq!(first.len(), 2);
}
