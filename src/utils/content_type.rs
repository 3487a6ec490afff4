use mime_guess::mime::Mime;

/// 根据响应的 Content-Type 选择下载文件的扩展名（包含前导 `.`）
pub fn file_extension(content_type: Option<&str>) -> String {
    let Some(mime) = content_type.and_then(|ct| ct.trim().parse::<Mime>().ok()) else {
        return ".bin".to_string();
    };

    match mime.essence_str() {
        "text/plain" => return ".txt".to_string(),
        "application/toml" => return ".toml".to_string(),
        "application/octet-stream" => return ".bin".to_string(),
        _ => {}
    }

    mime_guess::get_mime_extensions(&mime)
        .and_then(|exts| exts.first())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| ".bin".to_string())
}

/// 下载文件名：`<api_id>_<unix 秒><ext>`
pub fn download_filename(api_id: &str, unix_seconds: i64, content_type: Option<&str>) -> String {
    format!("{}_{}{}", api_id, unix_seconds, file_extension(content_type))
}
