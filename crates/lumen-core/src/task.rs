//! Task labels and the prompt templates attached to them.
//!
//! The label on a request is free-form. A handful of labels select a
//! template that asks the model for a structured answer; anything else is
//! sent to the model as the bare prompt.

use std::fmt;

/// Task selected by a request's label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Open-ended question about the image.
    General,
    /// Points satisfying a description, as normalized coordinates.
    Pointing,
    /// Graspable/usable region for an end effector.
    Affordance,
    /// Key points of a motion trajectory.
    Trajectory,
    /// Bounding box of a described region.
    Grounding,
    /// Any other label, passed through untouched.
    Custom(String),
}

impl Task {
    /// Resolves a label. Blank labels mean [`Task::General`].
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "general" => Self::General,
            "pointing" => Self::Pointing,
            "affordance" => Self::Affordance,
            "trajectory" => Self::Trajectory,
            "grounding" => Self::Grounding,
            _ => Self::Custom(trimmed.to_string()),
        }
    }

    /// Builds the text actually sent to the model for `prompt`.
    pub fn render_prompt(&self, prompt: &str) -> String {
        match self {
            Self::General | Self::Custom(_) => prompt.to_string(),
            Self::Pointing => format!(
                "{prompt}. Your answer should be formatted as a list of tuples, i.e. \
                 [(x1, y1), (x2, y2), ...], where each tuple contains the x and y \
                 coordinates of a point satisfying the conditions above. The coordinates \
                 should indicate the normalized pixel locations of the points in the image."
            ),
            Self::Affordance => format!(
                "You are a robot using the joint control. The task is \"{prompt}\". \
                 Please predict a possible affordance area of the end effector."
            ),
            Self::Trajectory => format!(
                "You are a robot using the joint control. The task is \"{prompt}\". \
                 Please predict up to 10 key trajectory points to complete the task. \
                 Your answer should be formatted as a list of tuples, i.e. \
                 [[x1, y1], [x2, y2], ...], where each tuple contains the x and y \
                 coordinates of a point."
            ),
            Self::Grounding => format!(
                "Please provide the bounding box coordinate of the region this sentence \
                 describes: {prompt}."
            ),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::General => "general",
            Self::Pointing => "pointing",
            Self::Affordance => "affordance",
            Self::Trajectory => "trajectory",
            Self::Grounding => "grounding",
            Self::Custom(label) => label,
        };
        write!(f, "{}", s)
    }
}
