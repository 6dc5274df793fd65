pub mod system_prompt;
