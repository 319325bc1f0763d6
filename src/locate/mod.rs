pub mod navigation;
pub mod overlay;
pub mod page_locator;
