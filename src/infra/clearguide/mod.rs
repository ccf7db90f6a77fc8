mod client;

pub use client::ClearGuideClient;
