use async_trait::async_trait;

use super::exec::{run_args, ExecContext};
use super::Tool;
use crate::errors::AgentResult;

pub struct TrivyTool;

#[async_trait]
impl Tool for TrivyTool {
    fn name(&self) -> &str {
        "trivy"
    }

    fn description(&self) -> &str {
        "Scans a container image for vulnerabilities. Input: an image reference. Output: the vulnerabilities found in the image."
    }

    async fn call(&self, input: &str, ctx: &ExecContext) -> AgentResult<String> {
        let image = normalize_image(input);
        run_args("trivy", &["image", image, "--scanners", "vuln"], ctx).await
    }
}

/// Models often echo the `image <ref>` form of the CLI back as input.
fn normalize_image(input: &str) -> &str {
    let image = input.trim();
    image.strip_prefix("image ").unwrap_or(image).trim()
}
