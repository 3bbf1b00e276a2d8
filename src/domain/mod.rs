pub mod direction;
pub mod kind;
pub mod material;
pub mod object;
