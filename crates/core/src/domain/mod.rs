pub mod debate;
pub mod evidence;
pub mod task;
