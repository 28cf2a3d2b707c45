pub mod reconciler;
pub mod taint;
pub mod traits;
