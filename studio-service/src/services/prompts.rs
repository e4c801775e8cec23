//! Prompt templates sent to the generative API.

use crate::catalog::{AspectRatio, StylePreset};

pub const ANALYSIS_PROMPT: &str = "What is this image? Provide a detailed description.";

pub const SEGMENTATION_PROMPT: &str = "Detect the prominent objects in this image. \
Return only a JSON list with one entry per object. Each entry has \"label\" (a short \
description), \"box_2d\" ([ymin, xmin, ymax, xmax] normalized to 0-1000) and \"mask\" \
(a base64 encoded PNG segmentation mask for the box region).";

pub fn generation(prompt: &str, style: &StylePreset, ratio: &AspectRatio) -> String {
    format!(
        "Create a {} image: {}. {}. high resolution, sharp focus, highly detailed, masterpiece, \
         best quality, ultra-detailed, 8k, HDR. Professional lighting and composition.",
        style.description, prompt, ratio.description
    )
}

pub fn edit(prompt: &str, style: &StylePreset, ratio: &AspectRatio) -> String {
    format!(
        "Modify this image by: {}. Style: {}. Format: {}. Maintain high resolution, sharp focus, \
         highly detailed, masterpiece quality and preserve the original composition while making \
         the requested changes.",
        prompt, style.description, ratio.description
    )
}

pub fn composition(
    prompt: &str,
    image_count: usize,
    style: &StylePreset,
    ratio: &AspectRatio,
) -> String {
    format!(
        "Compose and combine these {} images to create: {}. Style: {}. Format: {}. Create a \
         cohesive composition with high resolution, sharp focus, highly detailed, masterpiece \
         quality that seamlessly blends the input images according to the description.",
        image_count, prompt, style.description, ratio.description
    )
}
