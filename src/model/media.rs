//! Image media shown in a tab

use crate::rasterizer::{Texture, Vec2};

use super::ViewTransform;

#[derive(Clone)]
pub struct MediaModel<'a> {
    pub image: &'a Texture,
    /// Index of the image among the loaded media files
    pub media_index: usize,
    pub opacity: f32,
    /// Pan and zoom; rotation is ignored for images
    pub view: ViewTransform,
    /// Registration control points in image pixel coordinates
    pub control_points: &'a [Vec2],
}

impl<'a> MediaModel<'a> {
    pub fn new(image: &'a Texture, media_index: usize) -> Self {
        Self {
            image,
            media_index,
            opacity: 1.0,
            view: ViewTransform::default(),
            control_points: &[],
        }
    }
}
