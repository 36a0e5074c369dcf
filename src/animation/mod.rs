/// Web Animations style timing state machine.
pub mod anim;
/// Easing functions.
pub mod ease;
