mod dtw;

// Dynamic Time Warping
pub use dtw::{DtwResult, dtw, dtw_distance};
