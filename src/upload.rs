// src/upload.rs
use crate::error::ApiError;
use bytes::Buf;
use futures::TryStreamExt;
use warp::multipart::FormData;

const FILE_FIELD: &str = "file";
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Pulls the `file` part out of a multipart upload and returns it as text.
///
/// Parts are consumed in order; a part's body must be read before the next
/// part can be polled, so other fields are dropped as they go by.
pub async fn read_csv_upload(form: FormData) -> Result<String, ApiError> {
    futures::pin_mut!(form);
    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if part.name() != FILE_FIELD {
            continue;
        }

        if !is_csv_filename(part.filename()) {
            return Err(ApiError::BadRequest("File must be a CSV file".to_string()));
        }

        let data = part
            .stream()
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(chunk.chunk());
                Ok(acc)
            })
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        return Ok(decode_text(&data));
    }

    Err(ApiError::BadRequest("Missing file field".to_string()))
}

fn is_csv_filename(filename: Option<&str>) -> bool {
    filename
        .map(|name| name.to_ascii_lowercase().ends_with(".csv"))
        .unwrap_or(false)
}

/// UTF-8 when valid, otherwise Latin-1 (as windows-1252).
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utf8_and_strips_bom() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFSymbol,Shares"), "Symbol,Shares");
        assert_eq!(decode_text("Nestlé,1".as_bytes()), "Nestlé,1");
    }

    #[test]
    fn falls_back_to_latin1() {
        assert_eq!(decode_text(b"Nestl\xE9,1"), "Nestlé,1");
    }

    #[test]
    fn csv_extension_check() {
        assert!(is_csv_filename(Some("export.csv")));
        assert!(is_csv_filename(Some("EXPORT.CSV")));
        assert!(!is_csv_filename(Some("export.xlsx")));
        assert!(!is_csv_filename(None));
    }
}
