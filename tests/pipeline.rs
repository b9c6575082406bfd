//! End-to-end pipeline tests driving the `intake` binary: submit →
//! process → status → products/movements, with spreadsheet fixtures built
//! in memory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn intake_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("intake");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::create_dir_all(root.join("inbox")).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/intake.sqlite"

[intake]
default_vendor = "generic"
max_document_chars = 50000

[processing]
match_existing_only = false
add_to_stock = true

[extractor]
provider = "disabled"
"#,
        root.display()
    );

    let config_path = root.join("config").join("intake.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

/// Minimal xlsx with one sheet: a header row and the given data rows, all
/// cells as shared strings.
fn build_xlsx(headers: &[&str], rows: &[&[&str]]) -> Vec<u8> {
    let mut shared: Vec<String> = Vec::new();
    let mut index_of = |s: &str| -> usize {
        match shared.iter().position(|e| e == s) {
            Some(i) => i,
            None => {
                shared.push(s.to_string());
                shared.len() - 1
            }
        }
    };

    let mut sheet = String::new();
    let mut push_row = |row_num: usize, cells: &[&str], indexer: &mut dyn FnMut(&str) -> usize| {
        sheet.push_str(&format!("<row r=\"{}\">", row_num));
        for (col, value) in cells.iter().enumerate() {
            let col_letter = (b'A' + col as u8) as char;
            sheet.push_str(&format!(
                "<c r=\"{}{}\" t=\"s\"><v>{}</v></c>",
                col_letter,
                row_num,
                indexer(value)
            ));
        }
        sheet.push_str("</row>");
    };

    push_row(1, headers, &mut index_of);
    for (i, row) in rows.iter().enumerate() {
        push_row(i + 2, row, &mut index_of);
    }

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let opts = zip::write::SimpleFileOptions::default();

        zip.start_file("xl/sharedStrings.xml", opts).unwrap();
        let mut sst = String::from("<?xml version=\"1.0\"?><sst>");
        for s in &shared {
            sst.push_str(&format!("<si><t>{}</t></si>", s));
        }
        sst.push_str("</sst>");
        zip.write_all(sst.as_bytes()).unwrap();

        zip.start_file("xl/worksheets/sheet1.xml", opts).unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><worksheet><sheetData>{}</sheetData></worksheet>",
            sheet
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn run_intake(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = intake_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run intake binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Document id from `submit` output ("submitted <id>  <file>  ...").
fn submitted_id(stdout: &str) -> String {
    stdout
        .lines()
        .find(|l| l.starts_with("submitted "))
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or_else(|| panic!("no submitted id in output: {}", stdout))
        .to_string()
}

#[test]
fn init_creates_database_and_is_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_intake(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));

    let (_, _, success) = run_intake(&config_path, &["init"]);
    assert!(success, "second init failed (not idempotent)");
}

#[test]
fn vendors_lists_strategies_and_fallback() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_intake(&config_path, &["vendors"]);
    assert!(success);
    assert!(stdout.contains("amazon"));
    assert!(stdout.contains("blinkit"));
    assert!(stdout.contains("generic"));
}

#[test]
fn duplicate_rows_aggregate_and_reconcile_into_one_entry() {
    let (tmp, config_path) = setup_test_env();
    run_intake(&config_path, &["init"]);

    let xlsx = build_xlsx(
        &["Item Code", "Description", "Qty"],
        &[&["A1", "Widget", "5"], &["A1", "Widget", "3"]],
    );
    let file = tmp.path().join("inbox").join("po.xlsx");
    fs::write(&file, xlsx).unwrap();

    let (stdout, stderr, success) =
        run_intake(&config_path, &["submit", file.to_str().unwrap()]);
    assert!(success, "submit failed: {} {}", stdout, stderr);
    let id = submitted_id(&stdout);

    let (stdout, stderr, success) = run_intake(&config_path, &["process", &id]);
    assert!(success, "process failed: {} {}", stdout, stderr);
    assert!(stdout.contains("extracted: 2 raw items"), "{}", stdout);
    assert!(stdout.contains("created: 1"), "{}", stdout);
    assert!(stdout.contains("stock updated: 1"), "{}", stdout);

    let (stdout, _, success) = run_intake(&config_path, &["status", &id]);
    assert!(success);
    assert!(stdout.contains("status: COMPLETED"), "{}", stdout);
    assert!(stdout.contains("created 1"), "{}", stdout);

    let (stdout, _, success) = run_intake(&config_path, &["products"]);
    assert!(success);
    assert!(stdout.contains("A1"), "{}", stdout);
    assert!(stdout.contains("Widget"), "{}", stdout);
    // Aggregated quantity 5 + 3.
    assert!(stdout.contains("8"), "{}", stdout);
}

#[test]
fn reprocessing_requires_again_and_adds_stock() {
    let (tmp, config_path) = setup_test_env();
    run_intake(&config_path, &["init"]);

    let xlsx = build_xlsx(&["Item Code", "Description", "Qty"], &[&["B7", "Gadget", "10"]]);
    let file = tmp.path().join("inbox").join("po.xlsx");
    fs::write(&file, xlsx).unwrap();

    let (stdout, _, _) = run_intake(&config_path, &["submit", file.to_str().unwrap()]);
    let id = submitted_id(&stdout);

    let (_, _, success) = run_intake(&config_path, &["process", &id]);
    assert!(success);

    // Terminal state: a plain re-process must refuse.
    let (_, stderr, success) = run_intake(&config_path, &["process", &id]);
    assert!(!success);
    assert!(stderr.contains("--again"), "{}", stderr);

    // Fresh run with add-to-stock: 10 + 10.
    let (stdout, stderr, success) = run_intake(&config_path, &["process", &id, "--again"]);
    assert!(success, "{} {}", stdout, stderr);
    assert!(stdout.contains("updated: 1"), "{}", stdout);

    let (stdout, _, _) = run_intake(&config_path, &["products", "--query", "B7"]);
    assert!(stdout.contains("20"), "{}", stdout);
}

#[test]
fn replace_stock_sets_exact_quantity() {
    let (tmp, config_path) = setup_test_env();
    run_intake(&config_path, &["init"]);

    let xlsx = build_xlsx(&["Item Code", "Description", "Qty"], &[&["C3", "Sprocket", "10"]]);
    let file = tmp.path().join("inbox").join("po.xlsx");
    fs::write(&file, xlsx).unwrap();

    let (stdout, _, _) = run_intake(&config_path, &["submit", file.to_str().unwrap()]);
    let id = submitted_id(&stdout);
    run_intake(&config_path, &["process", &id]);

    let xlsx2 = build_xlsx(&["Item Code", "Description", "Qty"], &[&["C3", "Sprocket", "4"]]);
    let file2 = tmp.path().join("inbox").join("stocktake.xlsx");
    fs::write(&file2, xlsx2).unwrap();
    let (stdout, _, _) = run_intake(&config_path, &["submit", file2.to_str().unwrap()]);
    let id2 = submitted_id(&stdout);

    let (_, stderr, success) =
        run_intake(&config_path, &["process", &id2, "--replace-stock"]);
    assert!(success, "{}", stderr);

    let (stdout, _, _) = run_intake(&config_path, &["products", "--query", "C3"]);
    let qty_line = stdout.lines().find(|l| l.contains("C3")).unwrap();
    assert!(qty_line.contains(" 4 "), "{}", qty_line);
}

#[test]
fn pending_batch_processes_all_documents() {
    let (tmp, config_path) = setup_test_env();
    run_intake(&config_path, &["init"]);

    for (name, code) in [("one.xlsx", "D1"), ("two.xlsx", "D2")] {
        let xlsx = build_xlsx(&["Item Code", "Description", "Qty"], &[&[code, "Thing", "2"]]);
        fs::write(tmp.path().join("inbox").join(name), xlsx).unwrap();
    }

    let inbox = tmp.path().join("inbox");
    let (stdout, stderr, success) =
        run_intake(&config_path, &["submit", inbox.to_str().unwrap()]);
    assert!(success, "{} {}", stdout, stderr);
    assert!(stdout.contains("ok (2 documents)"), "{}", stdout);

    let (stdout, stderr, success) =
        run_intake(&config_path, &["process", "--pending", "--progress", "off"]);
    assert!(success, "{} {}", stdout, stderr);
    assert!(stdout.contains("completed: 2"), "{}", stdout);
    assert!(stdout.contains("failed: 0"), "{}", stdout);

    let (stdout, _, _) = run_intake(&config_path, &["products"]);
    assert!(stdout.contains("D1"));
    assert!(stdout.contains("D2"));
}

#[test]
fn empty_document_fails_with_recorded_cause() {
    let (tmp, config_path) = setup_test_env();
    run_intake(&config_path, &["init"]);

    let file = tmp.path().join("inbox").join("empty.txt");
    fs::write(&file, "   \n").unwrap();
    let (stdout, _, _) = run_intake(&config_path, &["submit", file.to_str().unwrap()]);
    let id = submitted_id(&stdout);

    let (_, _, success) = run_intake(&config_path, &["process", &id]);
    assert!(!success, "processing an empty document must fail");

    let (stdout, _, success) = run_intake(&config_path, &["status", &id]);
    assert!(success);
    assert!(stdout.contains("status: FAILED"), "{}", stdout);
    assert!(stdout.contains("no extractable"), "{}", stdout);
}

#[test]
fn adjust_writes_through_the_shared_ledger() {
    let (tmp, config_path) = setup_test_env();
    run_intake(&config_path, &["init"]);

    let xlsx = build_xlsx(&["Item Code", "Description", "Qty"], &[&["E5", "Doohickey", "8"]]);
    let file = tmp.path().join("inbox").join("po.xlsx");
    fs::write(&file, xlsx).unwrap();
    let (stdout, _, _) = run_intake(&config_path, &["submit", file.to_str().unwrap()]);
    let id = submitted_id(&stdout);
    run_intake(&config_path, &["process", &id]);

    let (stdout, stderr, success) = run_intake(
        &config_path,
        &["adjust", "E5", "--delta", "-3", "--reason", "DAMAGE"],
    );
    assert!(success, "{} {}", stdout, stderr);
    assert!(stdout.contains("new: 5"), "{}", stdout);

    let (stdout, _, success) = run_intake(&config_path, &["movements", "E5"]);
    assert!(success);
    assert!(stdout.contains("2 movements"), "{}", stdout);
    assert!(stdout.contains("IN"), "{}", stdout);
    assert!(stdout.contains("OUT"), "{}", stdout);
    assert!(stdout.contains("DAMAGE"), "{}", stdout);
}
