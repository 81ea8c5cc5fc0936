//! Translation of parsed subcommands into wire requests.

use serde_json::Value;
use tether_protocol::{LIST_TOOLS, PING, ParamMap, ToolRequest};

use crate::AppError;
use crate::cli::CliCommand;

/// Builds the request envelope for `command`.
///
/// `id` is echoed by the server and used to pick the matching response;
/// `token` is attached verbatim when present.
pub(crate) fn build_request(
    command: &CliCommand,
    id: String,
    token: Option<&str>,
) -> Result<ToolRequest, AppError> {
    let request = match command {
        CliCommand::Ping => ToolRequest::new(id, PING),
        CliCommand::ListTools => ToolRequest::new(id, LIST_TOOLS),
        CliCommand::Call { tool, params } => {
            let params = parse_params(params.as_deref())?;
            ToolRequest::new(id, tool.as_str()).with_params(params)
        }
    };
    Ok(request.with_token(token.map(str::to_owned)))
}

fn parse_params(raw: Option<&str>) -> Result<ParamMap, AppError> {
    let Some(text) = raw else {
        return Ok(ParamMap::new());
    };
    match serde_json::from_str::<Value>(text).map_err(AppError::ParseParams)? {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::ParamsNotObject),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn ping_carries_no_params() {
        let request =
            build_request(&CliCommand::Ping, String::from("req-1"), None).expect("request");
        assert_eq!(request.tool, PING);
        assert_eq!(request.id, json!("req-1"));
        assert!(request.params.is_empty());
        assert!(request.token.is_none());
    }

    #[test]
    fn token_is_attached_when_configured() {
        let request = build_request(&CliCommand::ListTools, String::from("req-2"), Some("s3cret"))
            .expect("request");
        assert_eq!(request.tool, LIST_TOOLS);
        assert_eq!(request.token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn call_parses_json_params() {
        let command = CliCommand::Call {
            tool: String::from("create_object"),
            params: Some(String::from(r#"{"type": "sphere", "name": "Ball"}"#)),
        };
        let request = build_request(&command, String::from("req-3"), None).expect("request");
        assert_eq!(request.tool, "create_object");
        assert_eq!(request.params.get("type"), Some(&json!("sphere")));
        assert_eq!(request.params.get("name"), Some(&json!("Ball")));
    }

    #[rstest]
    #[case::array("[1, 2]")]
    #[case::string("\"cube\"")]
    #[case::number("7")]
    fn call_rejects_non_object_params(#[case] raw: &str) {
        let command = CliCommand::Call {
            tool: String::from("create_object"),
            params: Some(raw.to_owned()),
        };
        let error = build_request(&command, String::from("req-4"), None)
            .expect_err("non-object params are rejected");
        assert!(matches!(error, AppError::ParamsNotObject));
    }

    #[test]
    fn call_reports_malformed_params() {
        let command = CliCommand::Call {
            tool: String::from("create_object"),
            params: Some(String::from("{not json")),
        };
        let error = build_request(&command, String::from("req-5"), None)
            .expect_err("malformed params are rejected");
        assert!(error.to_string().starts_with("invalid --params JSON"));
    }
}
