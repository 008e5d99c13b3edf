mod power;

pub use power::LinuxPower;
