use anyhow::{Context, Result, anyhow};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Trait for document-to-markdown converter implementations
///
/// Implementations must be safe for concurrent, repeated use and free of
/// side effects per call: a pure function from file path to extracted text.
#[async_trait::async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert the document at `path` to plain markdown text
    async fn convert(&self, path: &Path) -> Result<String>;
}

/// Built-in converter dispatching on the staged file's extension, with
/// content sniffing as a fallback for the generic placeholder extension.
pub struct MarkdownConverter;

#[async_trait::async_trait]
impl DocumentConverter for MarkdownConverter {
    async fn convert(&self, path: &Path) -> Result<String> {
        let path = path.to_path_buf();
        // Parser work is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || convert_file(&path))
            .await
            .map_err(|e| anyhow!("Conversion task failed: {}", e))?
    }
}

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "csv", "tsv", "json", "xml", "yaml", "yml", "toml", "log",
];

fn convert_file(path: &Path) -> Result<String> {
    let mut extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    // Staged files with the placeholder extension carry no format hint;
    // sniff the content instead.
    if extension == "tmp" || extension.is_empty() {
        if let Some(kind) = infer::get_from_path(path).ok().flatten() {
            extension = kind.extension().to_string();
        }
    }

    match extension.as_str() {
        "pdf" => convert_pdf(path),
        "docx" => convert_docx(path),
        "html" | "htm" => convert_html(path),
        ext if TEXT_EXTENSIONS.contains(&ext) => read_lossy(path),
        ext => Err(anyhow!("Unsupported file format: .{}", ext)),
    }
}

fn convert_pdf(path: &Path) -> Result<String> {
    let doc = lopdf::Document::load(path).context("Failed to load PDF")?;
    let mut text = String::new();

    for (page_num, _page_id) in doc.get_pages() {
        let page_text = doc
            .extract_text(&[page_num])
            .with_context(|| format!("Failed to extract text from page {}", page_num))?;
        text.push_str(page_text.trim_end());
        text.push('\n');
    }

    Ok(text.trim().to_string())
}

fn convert_docx(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path).context("Failed to open DOCX")?;
    let mut archive = ZipArchive::new(file).context("Failed to read DOCX archive")?;

    let mut xml_content = String::new();
    archive
        .by_name("word/document.xml")
        .context("DOCX is missing word/document.xml")?
        .read_to_string(&mut xml_content)
        .context("Failed to read DOCX body")?;

    let mut reader = Reader::from_reader(xml_content.as_bytes());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(e)) => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            // Paragraph boundaries become line breaks
            Ok(Event::End(e)) if e.local_name().as_ref() == b"p" => {
                text.push('\n');
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("Malformed DOCX body: {}", e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(text.trim().to_string())
}

fn convert_html(path: &Path) -> Result<String> {
    let html = read_lossy(path)?;

    let mut reader = Reader::from_reader(html.as_bytes());
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_ascii_lowercase();
                if name == b"script" || name == b"style" {
                    skip_depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name().as_ref().to_ascii_lowercase();
                if name == b"script" || name == b"style" {
                    skip_depth = skip_depth.saturating_sub(1);
                } else if matches!(
                    name.as_slice(),
                    b"p" | b"div"
                        | b"h1"
                        | b"h2"
                        | b"h3"
                        | b"h4"
                        | b"h5"
                        | b"h6"
                        | b"li"
                        | b"tr"
                ) {
                    text.push('\n');
                }
            }
            Ok(Event::Text(e)) if skip_depth == 0 => {
                let txt = String::from_utf8_lossy(e.as_ref());
                if !txt.trim().is_empty() {
                    text.push_str(txt.trim());
                    text.push(' ');
                }
            }
            Ok(Event::Eof) => break,
            // Tolerate malformed markup, keep what was extracted so far
            Err(_) => break,
            _ => (),
        }
        buf.clear();
    }

    Ok(text.trim().to_string())
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn staged(extension: &str, content: &[u8]) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new()
            .suffix(&format!(".{}", extension))
            .tempfile()
            .unwrap();
        std::fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn test_convert_plain_text() {
        let file = staged("txt", b"Hello conversion");
        assert_eq!(convert_file(file.path()).unwrap(), "Hello conversion");
    }

    #[test]
    fn test_convert_markdown_passthrough() {
        let file = staged("md", b"# Title\n\nBody text");
        let text = convert_file(file.path()).unwrap();
        assert!(text.contains("# Title"));
        assert!(text.contains("Body text"));
    }

    #[test]
    fn test_convert_invalid_utf8_is_lossy() {
        let file = staged("txt", &[0xFF, 0xFE, b'h', b'i']);
        let text = convert_file(file.path()).unwrap();
        assert!(text.contains("hi"));
    }

    #[test]
    fn test_unsupported_format() {
        let file = staged("xyz", b"whatever");
        let err = convert_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unsupported file format: .xyz"));
    }

    #[test]
    fn test_placeholder_extension_without_known_magic_fails() {
        // Plain text has no magic bytes, so a `.tmp` staged file stays
        // undispatchable and must error rather than panic.
        let file = staged("tmp", b"just some text");
        assert!(convert_file(file.path()).is_err());
    }

    #[test]
    fn test_placeholder_extension_sniffs_pdf_magic() {
        // infer routes this to the PDF branch; the truncated body then
        // fails inside lopdf with a load error, not an unsupported-format one.
        let file = staged("tmp", b"%PDF-1.4 truncated");
        let err = convert_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("PDF"));
    }

    #[test]
    fn test_convert_invalid_pdf() {
        let file = staged("pdf", b"not a pdf at all");
        let err = convert_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to load PDF"));
    }

    #[test]
    fn test_convert_docx() {
        let file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        let mut writer = zip::ZipWriter::new(std::fs::File::create(file.path()).unwrap());
        writer
            .start_file("word/document.xml", zip::write::FileOptions::default())
            .unwrap();
        writer
            .write_all(
                br#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Hello docx</w:t></w:r></w:p>
    <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>
  </w:body>
</w:document>"#,
            )
            .unwrap();
        writer.finish().unwrap();

        let text = convert_file(file.path()).unwrap();
        assert!(text.contains("Hello docx"));
        assert!(text.contains("Second paragraph"));
        assert!(text.find("Hello docx").unwrap() < text.find("Second paragraph").unwrap());
    }

    #[test]
    fn test_convert_docx_missing_body() {
        let file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        let mut writer = zip::ZipWriter::new(std::fs::File::create(file.path()).unwrap());
        writer
            .start_file("unrelated.xml", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(b"<x/>").unwrap();
        writer.finish().unwrap();

        let err = convert_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn test_convert_html_strips_markup_and_scripts() {
        let file = staged(
            "html",
            b"<html><head><style>body { color: red; }</style></head>\
              <body><h1>Heading</h1><p>Paragraph text</p>\
              <script>alert(1)</script></body></html>",
        );
        let text = convert_file(file.path()).unwrap();
        assert!(text.contains("Heading"));
        assert!(text.contains("Paragraph text"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color: red"));
    }

    #[tokio::test]
    async fn test_markdown_converter_trait() {
        let file = staged("txt", b"via the trait seam");
        let converter = MarkdownConverter;
        let text = converter.convert(file.path()).await.unwrap();
        assert_eq!(text, "via the trait seam");
    }
}
