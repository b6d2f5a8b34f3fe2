// Prompt table and content composition.
//
// Every request starts with a task tag such as `<OD>`. Grounding,
// segmentation and detection tasks carry an example text argument after the
// tag, and the region tasks carry a normalized bounding box written as
// `<loc_x1><loc_y1><loc_x2><loc_y2>` (each coordinate scaled to 0..=999).
// The arguments are literal examples; nothing here computes coordinates.

use crate::error::{FlorenceError, Result};
use crate::image::CONTENT_TYPE;

/// One entry of the fixed task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub id: usize,
    pub prompt: &'static str,
}

pub const TASK_PROMPTS: [&str; 14] = [
    "<CAPTION>",
    "<DETAILED_CAPTION>",
    "<MORE_DETAILED_CAPTION>",
    "<OD>",
    "<DENSE_REGION_CAPTION>",
    "<REGION_PROPOSAL>",
    "<CAPTION_TO_PHRASE_GROUNDING>A black and brown dog is laying on a grass field.",
    "<REFERRING_EXPRESSION_SEGMENTATION>a black and brown dog",
    "<REGION_TO_SEGMENTATION><loc_312><loc_168><loc_998><loc_846>",
    "<OPEN_VOCABULARY_DETECTION>a black and brown dog",
    "<REGION_TO_CATEGORY><loc_312><loc_168><loc_998><loc_846>",
    "<REGION_TO_DESCRIPTION><loc_312><loc_168><loc_998><loc_846>",
    "<OCR>",
    "<OCR_WITH_REGION>",
];

impl Task {
    pub const COUNT: usize = TASK_PROMPTS.len();

    pub fn from_id(id: usize) -> Result<Task> {
        TASK_PROMPTS
            .get(id)
            .map(|prompt| Task { id, prompt })
            .ok_or_else(|| invalid_task_id(id.to_string()))
    }

    /// Parses a command-line task id. Negative and non-numeric values are
    /// rejected the same way as ids past the end of the table.
    pub fn parse(arg: &str) -> Result<Task> {
        let id: usize = arg
            .trim()
            .parse()
            .map_err(|_| invalid_task_id(arg.to_string()))?;
        Task::from_id(id)
    }

    pub fn all() -> impl Iterator<Item = Task> {
        TASK_PROMPTS
            .iter()
            .enumerate()
            .map(|(id, prompt)| Task { id, prompt })
    }

    /// The leading task tag, e.g. `<REGION_TO_CATEGORY>`.
    pub fn tag(&self) -> &'static str {
        match self.prompt.find('>') {
            Some(end) => &self.prompt[..=end],
            None => self.prompt,
        }
    }

    /// Text following the tag, if the task takes one.
    pub fn text_argument(&self) -> Option<&'static str> {
        let rest = &self.prompt[self.tag().len()..];
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

fn invalid_task_id(given: String) -> FlorenceError {
    FlorenceError::InvalidTaskId {
        given,
        max: Task::COUNT - 1,
    }
}

/// Where the model should read the image from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// An uploaded NVCF asset.
    Asset(String),
    /// Base64 image bytes embedded in the request.
    Inline(String),
}

impl ImageRef {
    pub fn tag(&self) -> String {
        match self {
            ImageRef::Asset(id) => format!(r#"<img src="data:{CONTENT_TYPE};asset_id,{id}" />"#),
            ImageRef::Inline(b64) => format!(r#"<img src="data:{CONTENT_TYPE};base64,{b64}" />"#),
        }
    }

    pub fn asset_id(&self) -> Option<&str> {
        match self {
            ImageRef::Asset(id) => Some(id),
            ImageRef::Inline(_) => None,
        }
    }
}

/// Task template followed by the image tag, verbatim.
pub fn build_content(task: &Task, image: &ImageRef) -> String {
    format!("{}{}", task.prompt, image.tag())
}

/// Content for a task id and an uploaded asset.
pub fn generate_content(task_id: usize, asset_id: &str) -> Result<String> {
    let task = Task::from_id(task_id)?;
    Ok(build_content(&task, &ImageRef::Asset(asset_id.to_string())))
}
