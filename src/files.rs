use crate::config::UploadLimits;
use crate::model::Attachment;

pub const TYPE_IMAGE: &str = "image";
pub const TYPE_PDF: &str = "application/pdf";
pub const TYPE_WORD: &str = "application/msword";
pub const TYPE_POWERPOINT: &str = "application/vnd.ms-powerpoint";
pub const TYPE_TEXT: &str = "text";
pub const TYPE_OTHER: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{name} is {size} bytes, over the {limit} byte limit")]
pub struct TooLarge {
    pub name: String,
    pub size: u64,
    pub limit: u64,
}

fn extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = last.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Coarse type tag inferred from the URL's extension.
pub fn classify(url: &str) -> &'static str {
    match extension(url).as_deref() {
        Some("jpeg" | "jpg" | "png" | "gif" | "webp") => TYPE_IMAGE,
        Some("pdf") => TYPE_PDF,
        Some("doc" | "docx") => TYPE_WORD,
        Some("ppt" | "pptx" | "pps" | "ppsx" | "pptm") => TYPE_POWERPOINT,
        Some("txt") => TYPE_TEXT,
        _ => TYPE_OTHER,
    }
}

pub fn file_name_from_url(url: &str, index: usize) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => format!("file-{index}"),
    }
}

/// `None` for the catch-all type, which is never size-checked.
pub fn limit_for(file_type: &str, limits: &UploadLimits) -> Option<u64> {
    match file_type {
        TYPE_IMAGE => Some(limits.image_max_bytes),
        TYPE_PDF => Some(limits.pdf_max_bytes),
        TYPE_TEXT => Some(limits.text_max_bytes),
        TYPE_WORD | TYPE_POWERPOINT => Some(limits.office_max_bytes),
        _ => None,
    }
}

pub fn check_size(att: &Attachment, limits: &UploadLimits) -> Result<(), TooLarge> {
    if att.size == 0 {
        return Ok(());
    }
    match limit_for(&att.file_type, limits) {
        Some(limit) if att.size > limit => Err(TooLarge {
            name: att.name.clone(),
            size: att.size,
            limit,
        }),
        _ => Ok(()),
    }
}

pub fn describe(url: &str, size: Option<u64>, index: usize) -> Attachment {
    Attachment {
        name: file_name_from_url(url, index),
        file_type: classify(url).to_string(),
        size: size.unwrap_or(0),
        url: url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_extension_case_insensitive() {
        assert_eq!(classify("https://u.test/f/Photo.JPG"), TYPE_IMAGE);
        assert_eq!(classify("https://u.test/f/scan.webp"), TYPE_IMAGE);
        assert_eq!(classify("https://u.test/f/essay.pdf?dl=1"), TYPE_PDF);
        assert_eq!(classify("https://u.test/f/essay.docx"), TYPE_WORD);
        assert_eq!(classify("https://u.test/f/deck.ppsx"), TYPE_POWERPOINT);
        assert_eq!(classify("https://u.test/f/readme.txt"), TYPE_TEXT);
        assert_eq!(classify("https://u.test/f/archive.zip"), TYPE_OTHER);
        assert_eq!(classify("https://u.test/f/no-extension"), TYPE_OTHER);
    }

    #[test]
    fn pdf_inside_directory_name_is_not_an_extension() {
        assert_eq!(classify("https://u.test/report.pdf/download"), TYPE_OTHER);
    }

    #[test]
    fn name_falls_back_to_index() {
        assert_eq!(file_name_from_url("https://u.test/f/abc.png", 0), "abc.png");
        assert_eq!(file_name_from_url("https://u.test/f/", 3), "file-3");
    }

    #[test]
    fn unknown_size_always_passes() {
        let limits = UploadLimits::default();
        let att = describe("https://u.test/huge.pdf", None, 0);
        assert!(check_size(&att, &limits).is_ok());
    }

    #[test]
    fn oversize_pdf_rejected_but_office_allowed() {
        let limits = UploadLimits::default();
        let five_mb = 5 * 1024 * 1024;
        let pdf = describe("https://u.test/big.pdf", Some(five_mb), 0);
        let err = check_size(&pdf, &limits).expect_err("pdf over 4MB");
        assert_eq!(err.limit, limits.pdf_max_bytes);

        let deck = describe("https://u.test/big.pptx", Some(five_mb), 1);
        assert!(check_size(&deck, &limits).is_ok());
    }
}
