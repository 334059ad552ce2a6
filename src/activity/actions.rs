use crate::activity::node::RequestRecord;
use crate::common::error::AppError;
use crate::common::utils::shell_quote;

/// User-invocable operations on a request row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    OpenUrl,
    CopyUrl,
    CopyAsCurl,
}

impl RowAction {
    pub const ALL: [RowAction; 3] = [RowAction::OpenUrl, RowAction::CopyUrl, RowAction::CopyAsCurl];

    pub fn label(self) -> &'static str {
        match self {
            RowAction::OpenUrl => "Open URL",
            RowAction::CopyUrl => "Copy URL",
            RowAction::CopyAsCurl => "Copy as cURL",
        }
    }
}

/// Host facilities the row actions hand their result to
pub trait DesktopServices {
    fn open_url(&mut self, url: &url::Url) -> Result<(), AppError>;
    fn set_clipboard(&mut self, text: String) -> Result<(), AppError>;
}

pub fn perform(
    action: RowAction,
    record: &RequestRecord,
    desktop: &mut dyn DesktopServices,
) -> Result<(), AppError> {
    log::debug!("[Activity] {} for request {}", action.label(), record.id);
    match action {
        RowAction::OpenUrl => desktop.open_url(&record.url),
        RowAction::CopyUrl => desktop.set_clipboard(record.url.to_string()),
        RowAction::CopyAsCurl => desktop.set_clipboard(curl_command(record)),
    }
}

/// Shell command replaying `record` with curl.
///
/// The body is only included for POST and PUT.
pub fn curl_command(record: &RequestRecord) -> String {
    let mut cmd = format!("curl {} ", shell_quote(record.url.as_str()));
    for header in &record.headers {
        cmd.push_str(&format!(
            "-H {} ",
            shell_quote(&format!("{}: {}", header.name, header.value))
        ));
    }
    if record.method.carries_body() {
        cmd.push_str(&format!("--data {} ", shell_quote(&record.body_text())));
    }
    cmd.push_str("--compressed");
    cmd
}
