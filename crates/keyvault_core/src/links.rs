//! Shareable paste links of the form `{base}/#/view/{id}`.

const VIEW_SEGMENT: &str = "/view/";

/// Build the share link for `id`.
///
/// # Arguments
/// - `base`: Public origin of the web client; trailing slashes are ignored.
/// - `id`: Store-assigned paste id.
pub fn share_url(base: &str, id: &str) -> String {
    format!("{}/#/view/{}", base.trim_end_matches('/'), id)
}

/// Extract a paste id from a share link or a bare id.
///
/// # Returns
/// `None` when the input is blank or the `/view/` segment is empty.
pub fn paste_id_from_link(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Some(index) = trimmed.rfind(VIEW_SEGMENT) else {
        return (!trimmed.contains('/')).then(|| trimmed.to_string());
    };
    let id: String = trimmed[index + VIEW_SEGMENT.len()..]
        .chars()
        .take_while(|ch| !matches!(ch, '/' | '?' | '#'))
        .collect();
    (!id.is_empty()).then_some(id)
}
