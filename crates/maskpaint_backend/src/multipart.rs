//! Minimal `multipart/form-data` body writer for model uploads.

use std::path::Path;

pub(crate) struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub(crate) fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub(crate) fn text(&mut self, name: &str, value: &str) {
        self.part_header(name, None);
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
    }

    pub(crate) fn file(&mut self, name: &str, path: &Path, contents: &[u8]) {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        self.part_header(name, Some(&filename));
        self.body.extend_from_slice(contents);
        self.body.extend_from_slice(b"\r\n");
    }

    fn part_header(&mut self, name: &str, filename: Option<&str>) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        let disposition = match filename {
            Some(f) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                name, f
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name),
        };
        self.body.extend_from_slice(disposition.as_bytes());
    }

    pub(crate) fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_layout() {
        let mut form = MultipartBody::new("XYZ");
        form.text("sd3_path", "/models/sd3");
        form.file("lora_file", Path::new("/tmp/lora.bin"), b"abc");
        assert_eq!(form.content_type(), "multipart/form-data; boundary=XYZ");

        let body = String::from_utf8(form.finish()).unwrap();
        assert!(body.starts_with("--XYZ\r\nContent-Disposition: form-data; name=\"sd3_path\"\r\n\r\n/models/sd3\r\n"));
        assert!(body.contains("name=\"lora_file\"; filename=\"lora.bin\""));
        assert!(body.contains("\r\n\r\nabc\r\n"));
        assert!(body.ends_with("--XYZ--\r\n"));
    }
}
