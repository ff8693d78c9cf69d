use crate::{constant::TRACKING_MARKER, tracker::Comment};

/// First comment, in listing order, carrying the tracking marker.
pub fn find_tracking_comment(comments: &[Comment]) -> Option<&Comment> {
    comments
        .iter()
        .find(|comment| comment.body.contains(TRACKING_MARKER))
}
