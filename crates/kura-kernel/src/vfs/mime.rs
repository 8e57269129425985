//! Content-type lookup by file extension.

/// Fallback content type when nothing better is known.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Guess a content type from the extension of `path`.
pub fn guess_mime_type(path: &str) -> &'static str {
    let Some((stem, ext)) = path.rsplit_once('.') else {
        return DEFAULT_MIME_TYPE;
    };
    // ".bashrc" and "dir.d/file" have no extension.
    if stem.is_empty() || stem.ends_with('/') || ext.contains('/') {
        return DEFAULT_MIME_TYPE;
    }

    match ext.to_ascii_lowercase().as_str() {
        // Text
        "txt" | "text" | "log" | "conf" | "cfg" | "ini" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" | "xhtml" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "ics" => "text/calendar",
        "vcf" => "text/vcard",
        "rtf" => "application/rtf",
        "xml" | "xsl" => "application/xml",
        "js" | "mjs" | "cjs" => "application/javascript",
        "json" | "map" => "application/json",
        "jsonld" => "application/ld+json",
        "toml" => "application/toml",
        "yaml" | "yml" => "application/yaml",
        "sql" => "application/sql",
        "graphql" | "gql" => "application/graphql",
        // Source
        "rs" => "text/x-rust",
        "py" => "text/x-python",
        "c" | "h" => "text/x-c",
        "cc" | "cpp" | "cxx" | "hpp" => "text/x-c++",
        "go" => "text/x-go",
        "java" => "text/x-java-source",
        "rb" => "text/x-ruby",
        "lua" => "text/x-lua",
        "sh" | "bash" => "application/x-sh",
        "ps1" => "application/x-powershell",
        // Images
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "svg" | "svgz" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        "heic" => "image/heic",
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "epub" => "application/epub+zip",
        // Archives
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "bz2" => "application/x-bzip2",
        "xz" => "application/x-xz",
        "zst" => "application/zstd",
        "7z" => "application/x-7z-compressed",
        "rar" => "application/vnd.rar",
        "tar" => "application/x-tar",
        "jar" => "application/java-archive",
        "wasm" => "application/wasm",
        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "m4a" => "audio/mp4",
        "opus" => "audio/opus",
        "mid" | "midi" => "audio/midi",
        // Video
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mpeg" | "mpg" => "video/mpeg",
        "ogv" => "video/ogg",
        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => DEFAULT_MIME_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("test1/file1.txt"), "text/plain");
        assert_eq!(guess_mime_type("a/b/page.HTML"), "text/html");
        assert_eq!(guess_mime_type("data.json"), "application/json");
        assert_eq!(guess_mime_type("image.png"), "image/png");
        assert_eq!(
            guess_mime_type("report.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(guess_mime_type("clip.webm"), "video/webm");
        assert_eq!(guess_mime_type("backup.tar.gz"), "application/gzip");
        assert_eq!(guess_mime_type("font.TTF"), "font/ttf");
    }

    #[test]
    fn test_guess_mime_type_fallback() {
        assert_eq!(guess_mime_type("noext"), DEFAULT_MIME_TYPE);
        assert_eq!(guess_mime_type(".bashrc"), DEFAULT_MIME_TYPE);
        assert_eq!(guess_mime_type("conf.d/settings"), DEFAULT_MIME_TYPE);
        assert_eq!(guess_mime_type("blob.unknownext"), DEFAULT_MIME_TYPE);
    }
}
