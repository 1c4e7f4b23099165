mod driver;

pub use driver::ChromeDriver;
