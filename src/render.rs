/// Frame painting and transition blending.
pub mod frame;
