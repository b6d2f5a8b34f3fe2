// The run itself: validate every local input, upload the image, compose the
// content, call the model, unpack the answer. Each step runs once, in order.

use crate::api::ApiClient;
use crate::archive;
use crate::config::{Config, ImageMode};
use crate::error::{FlorenceError, Result};
use crate::image;
use crate::prompt::{self, ImageRef, Task};
use crate::ui;
use std::path::PathBuf;
use tracing::{debug, info};

/// Positional arguments of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub image_path: PathBuf,
    pub result_dir: PathBuf,
    pub task_id: String,
}

impl Invocation {
    /// Takes the arguments after the program name.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        match <[String; 3]>::try_from(args) {
            Ok([image_path, result_dir, task_id]) => Ok(Invocation {
                image_path: PathBuf::from(image_path),
                result_dir: PathBuf::from(result_dir),
                task_id,
            }),
            Err(args) => Err(FlorenceError::Usage { given: args.len() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// `None` when the image was sent inline.
    pub asset_id: Option<String>,
    pub result_dir: PathBuf,
    pub files: Vec<String>,
}

pub fn run(config: &Config, invocation: &Invocation) -> Result<RunReport> {
    let task = Task::parse(&invocation.task_id)?;
    let bytes = image::load_image(&invocation.image_path)?;
    let client = ApiClient::new(config)?;
    debug!(task = task.tag(), image_bytes = bytes.len(), "inputs validated");

    let image_ref = match inline_image(config, &bytes) {
        Some(b64) => {
            info!(encoded_len = b64.len(), "sending image inline");
            ImageRef::Inline(b64)
        }
        None => {
            let spinner = ui::spinner("Uploading image...");
            let uploaded = client.upload_asset(&bytes, &config.asset_description);
            spinner.finish_and_clear();
            ImageRef::Asset(uploaded?.id)
        }
    };

    let content = prompt::build_content(&task, &image_ref);
    info!(task = task.tag(), asset_id = ?image_ref.asset_id(), "requesting inference");

    let spinner = ui::spinner("Waiting for inference...");
    let body = client.infer(&content, image_ref.asset_id());
    spinner.finish_and_clear();
    let files = archive::save_and_extract(&body?, &invocation.result_dir)?;

    Ok(RunReport {
        asset_id: image_ref.asset_id().map(str::to_string),
        result_dir: invocation.result_dir.clone(),
        files,
    })
}

fn inline_image(config: &Config, bytes: &[u8]) -> Option<String> {
    match config.image_mode {
        ImageMode::Asset => None,
        ImageMode::InlineWhenSmall => image::inline_base64(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_zip, JPEG_BYTES};
    use mockito::Matcher;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn config_for(server: &mockito::Server) -> Config {
        Config {
            assets_url: format!("{}/v2/nvcf/assets", server.url()),
            inference_url: format!("{}/v1/vlm/microsoft/florence-2", server.url()),
            ..Config::default()
        }
        .with_api_key("nvapi-test")
        .unwrap()
    }

    struct Workspace {
        _tmp: TempDir,
        invocation: Invocation,
    }

    fn workspace(task_id: &str) -> Workspace {
        let tmp = TempDir::new().unwrap();
        let image_path = tmp.path().join("car.jpg");
        fs::write(&image_path, JPEG_BYTES).unwrap();
        let invocation = Invocation {
            image_path,
            result_dir: tmp.path().join("result_dir"),
            task_id: task_id.to_string(),
        };
        Workspace { _tmp: tmp, invocation }
    }

    fn mock_upload(server: &mut mockito::Server, asset_id: &str) -> (mockito::Mock, mockito::Mock) {
        let upload_url = format!("{}/upload/{asset_id}", server.url());
        let register = server
            .mock("POST", "/v2/nvcf/assets")
            .with_status(200)
            .with_body(json!({"uploadUrl": upload_url, "assetId": asset_id}).to_string())
            .create();
        let upload = server
            .mock("PUT", format!("/upload/{asset_id}").as_str())
            .with_status(200)
            .create();
        (register, upload)
    }

    #[test]
    fn from_args_requires_exactly_three() {
        let invocation = Invocation::from_args(args(&["car.jpg", "out", "0"])).unwrap();
        assert_eq!(invocation.image_path, PathBuf::from("car.jpg"));
        assert_eq!(invocation.result_dir, PathBuf::from("out"));
        assert_eq!(invocation.task_id, "0");

        for bad in [&[][..], &["car.jpg", "out"][..], &["car.jpg", "out", "0", "extra"][..]] {
            let err = Invocation::from_args(args(bad)).unwrap_err();
            assert!(matches!(err, FlorenceError::Usage { given } if given == bad.len()));
        }
    }

    #[test]
    fn full_run_extracts_response() {
        let mut server = mockito::Server::new();
        let (register, upload) = mock_upload(&mut server, "abc123");
        let inference = server
            .mock("POST", "/v1/vlm/microsoft/florence-2")
            .match_header("nvcf-input-asset-references", "abc123")
            .match_header("nvcf-function-asset-ids", "abc123")
            .match_body(Matcher::Json(json!({
                "messages": [{
                    "role": "user",
                    "content": r#"<CAPTION><img src="data:image/jpeg;asset_id,abc123" />"#
                }]
            })))
            .with_status(200)
            .with_body(sample_zip(&[("a.txt", "a dog"), ("b.json", "{}")]))
            .create();
        let ws = workspace("0");

        let report = run(&config_for(&server), &ws.invocation).unwrap();

        assert_eq!(report.asset_id.as_deref(), Some("abc123"));
        assert_eq!(report.files, vec!["a.txt".to_string(), "b.json".to_string()]);
        let listing = ui::format_listing(&report);
        assert!(listing.contains("a.txt") && listing.contains("b.json"));
        register.assert();
        upload.assert();
        inference.assert();
    }

    #[test]
    fn invalid_task_id_makes_no_requests() {
        let mut server = mockito::Server::new();
        let post = server.mock("POST", Matcher::Any).expect(0).create();
        let put = server.mock("PUT", Matcher::Any).expect(0).create();
        let ws = workspace("14");

        let err = run(&config_for(&server), &ws.invocation).unwrap_err();

        assert!(matches!(err, FlorenceError::InvalidTaskId { .. }));
        assert!(!ws.invocation.result_dir.exists());
        post.assert();
        put.assert();
    }

    #[test]
    fn inference_failure_writes_nothing() {
        let mut server = mockito::Server::new();
        let _upload = mock_upload(&mut server, "abc123");
        let _inference = server
            .mock("POST", "/v1/vlm/microsoft/florence-2")
            .with_status(500)
            .with_body("Internal Server Error")
            .create();
        let ws = workspace("3");

        let err = run(&config_for(&server), &ws.invocation).unwrap_err();

        assert!(err.is_transport());
        assert!(!archive::archive_path(&ws.invocation.result_dir).exists());
        assert!(!ws.invocation.result_dir.exists());
    }

    #[test]
    fn non_zip_success_body_is_archive_error() {
        let mut server = mockito::Server::new();
        let _upload = mock_upload(&mut server, "abc123");
        let _inference = server
            .mock("POST", "/v1/vlm/microsoft/florence-2")
            .with_status(200)
            .with_body(r#"{"status":"fail"}"#)
            .create();
        let ws = workspace("12");

        let err = run(&config_for(&server), &ws.invocation).unwrap_err();

        assert!(matches!(err, FlorenceError::Archive(_)));
    }

    #[test]
    fn small_image_goes_inline_when_enabled() {
        let mut server = mockito::Server::new();
        let register = server.mock("POST", "/v2/nvcf/assets").expect(0).create();
        let inference = server
            .mock("POST", "/v1/vlm/microsoft/florence-2")
            .match_header("nvcf-function-asset-ids", Matcher::Missing)
            .match_body(Matcher::Regex(r"data:image/jpeg;base64,".into()))
            .with_status(200)
            .with_body(sample_zip(&[("a.txt", "text")]))
            .create();
        let config = Config {
            image_mode: ImageMode::InlineWhenSmall,
            ..config_for(&server)
        };
        let ws = workspace("12");

        let report = run(&config, &ws.invocation).unwrap();

        assert_eq!(report.asset_id, None);
        assert_eq!(report.files, vec!["a.txt".to_string()]);
        register.assert();
        inference.assert();
    }
}
