//! Integration tests for multi-format uploads: PDF and DOCX files must go
//! through the same extract/classify/chunk pipeline as plain text.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn sdesk_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("sdesk");
    path
}

/// Minimal valid PDF containing the given phrase. Builds the body first,
/// then the xref with correct byte offsets so pdf-extract can parse it.
fn minimal_pdf_with_text(phrase: &str) -> Vec<u8> {
    let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET\n", phrase);

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}endstream endobj\n",
            stream.len(),
            stream
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o1).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o2).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o3).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o4).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o5).as_bytes());
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// Minimal DOCX (ZIP) containing word/document.xml with one paragraph.
fn minimal_docx_with_text(phrase: &str) -> Vec<u8> {
    use std::io::Write;
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
            phrase
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn setup_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::create_dir_all(root.join("files")).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/sdesk.sqlite"

[server]
bind = "127.0.0.1:7432"
"#,
        root.display()
    );

    let config_path = root.join("config/sdesk.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_sdesk(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(sdesk_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .expect("Failed to run sdesk binary");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn test_pdf_upload_extracts_and_classifies() {
    let (tmp, config_path) = setup_env();
    run_sdesk(&config_path, &["init"]);

    let pdf_path = tmp.path().join("files/earnings.pdf");
    fs::write(
        &pdf_path,
        minimal_pdf_with_text("Annual revenue and profit exceeded the budget."),
    )
    .unwrap();

    let (stdout, stderr, success) =
        run_sdesk(&config_path, &["upload", pdf_path.to_str().unwrap()]);
    assert!(success, "pdf upload failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("type financial"), "got: {}", stdout);
}

#[test]
fn test_docx_upload_extracts_and_classifies() {
    let (tmp, config_path) = setup_env();
    run_sdesk(&config_path, &["init"]);

    let docx_path = tmp.path().join("files/handbook.docx");
    fs::write(
        &docx_path,
        minimal_docx_with_text("Employee policy and procedure handbook for staff."),
    )
    .unwrap();

    let (stdout, stderr, success) =
        run_sdesk(&config_path, &["upload", docx_path.to_str().unwrap()]);
    assert!(success, "docx upload failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("type internal"), "got: {}", stdout);

    let (stdout, _, _) = run_sdesk(&config_path, &["documents"]);
    assert!(stdout.contains("handbook.docx"));
}

#[test]
fn test_corrupt_pdf_reported_not_crashed() {
    let (tmp, config_path) = setup_env();
    run_sdesk(&config_path, &["init"]);

    let pdf_path = tmp.path().join("files/broken.pdf");
    fs::write(&pdf_path, b"this is not a pdf at all").unwrap();

    let (_, stderr, success) = run_sdesk(&config_path, &["upload", pdf_path.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("broken.pdf"), "got: {}", stderr);
}

#[test]
fn test_latin1_text_file_accepted() {
    let (tmp, config_path) = setup_env();
    run_sdesk(&config_path, &["init"]);

    let txt_path = tmp.path().join("files/notes.txt");
    // 0xE9 is 'é' in Latin-1 and invalid as standalone UTF-8.
    fs::write(&txt_path, b"r\xe9sum\xe9 of the strategy meeting").unwrap();

    let (stdout, _, success) = run_sdesk(&config_path, &["upload", txt_path.to_str().unwrap()]);
    assert!(success, "got: {}", stdout);
    assert!(stdout.contains("Uploaded 1 document(s)"));
}

#[test]
fn test_mixed_directory_skips_unsupported() {
    let (tmp, config_path) = setup_env();
    run_sdesk(&config_path, &["init"]);

    let files_dir = tmp.path().join("files");
    fs::write(files_dir.join("a.txt"), "Market survey and competitor analysis.").unwrap();
    fs::write(
        files_dir.join("b.docx"),
        minimal_docx_with_text("Team organization chart."),
    )
    .unwrap();
    fs::write(files_dir.join("c.xlsx"), b"not supported").unwrap();

    let (stdout, _, success) =
        run_sdesk(&config_path, &["upload", files_dir.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("Uploaded 2 document(s), 0 failed"), "got: {}", stdout);
}
