pub mod a2a;
pub mod gateway;
pub mod llm;
