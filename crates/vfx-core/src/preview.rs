//! Hook for hosts that render texture previews.

/// Receives the texture paths a graph wants previewed.
///
/// Decoding and display happen outside this crate.
pub trait PreviewSink {
    fn request_preview(&mut self, path: &str);
}

/// Collects requested paths; handy for hosts that batch requests.
impl PreviewSink for Vec<String> {
    fn request_preview(&mut self, path: &str) {
        self.push(path.to_string());
    }
}
