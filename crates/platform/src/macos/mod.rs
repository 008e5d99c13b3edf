mod power;

pub use power::MacOSPower;
