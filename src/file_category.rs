/// Built-in extension-to-category mapping for the default rule.
///
/// The default classification rule sorts files into four fixed categories
/// by file extension. Extensions are compared lower-cased; anything not in
/// the image/video/document tables is `Others`.
///
/// # Examples
///
/// ```
/// use rulesort::file_category::Category;
///
/// assert_eq!(Category::for_extension("jpg"), Category::Images);
/// assert_eq!(Category::for_extension("PDF"), Category::Documents);
/// assert_eq!(Category::for_extension("xyz"), Category::Others);
/// ```
use std::fmt;

/// Image extensions recognized by the default rule.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png", "gif", "jpeg", "bmp", "svg"];

/// Video extensions recognized by the default rule.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "wmv"];

/// Document extensions recognized by the default rule.
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "txt", "doc", "docx", "rtf", "xlsx", "xls", "ppt", "pptx", "pdf",
];

/// One of the four fixed categories of the default classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Images,
    Videos,
    Documents,
    Others,
}

impl Category {
    /// Maps a file extension (without the leading dot) to its category.
    ///
    /// The lookup is case-insensitive. Unknown or empty extensions map to
    /// `Others`.
    pub fn for_extension(ext: &str) -> Self {
        let ext = ext.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Category::Images
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Category::Videos
        } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            Category::Documents
        } else {
            Category::Others
        }
    }

    /// Returns the destination directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use rulesort::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "images");
    /// assert_eq!(Category::Others.dir_name(), "others");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "images",
            Category::Videos => "videos",
            Category::Documents => "documents",
            Category::Others => "others",
        }
    }

    /// All categories, in the order the planner creates their folders.
    pub fn all() -> [Category; 4] {
        [
            Category::Images,
            Category::Videos,
            Category::Documents,
            Category::Others,
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extensions() {
        for ext in ["jpg", "png", "gif", "jpeg", "bmp", "svg"] {
            assert_eq!(Category::for_extension(ext), Category::Images);
        }
    }

    #[test]
    fn test_video_extensions() {
        for ext in ["mp4", "mov", "avi", "mkv", "wmv"] {
            assert_eq!(Category::for_extension(ext), Category::Videos);
        }
    }

    #[test]
    fn test_document_extensions() {
        for ext in ["txt", "doc", "docx", "rtf", "xlsx", "xls", "ppt", "pptx", "pdf"] {
            assert_eq!(Category::for_extension(ext), Category::Documents);
        }
    }

    #[test]
    fn test_unknown_extension_is_others() {
        assert_eq!(Category::for_extension("zip"), Category::Others);
        assert_eq!(Category::for_extension("rs"), Category::Others);
        assert_eq!(Category::for_extension(""), Category::Others);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Category::for_extension("JPG"), Category::Images);
        assert_eq!(Category::for_extension("Mp4"), Category::Videos);
        assert_eq!(Category::for_extension("DocX"), Category::Documents);
    }

    #[test]
    fn test_dir_names() {
        assert_eq!(Category::Images.dir_name(), "images");
        assert_eq!(Category::Videos.dir_name(), "videos");
        assert_eq!(Category::Documents.dir_name(), "documents");
        assert_eq!(Category::Others.dir_name(), "others");
    }
}
