//! UI utilities for the client.

use std::io::Write;

/// Redisplay the prompt after receiving a frame
pub fn redisplay_prompt(user_id: &str) {
    print!("{}> ", user_id);
    std::io::stdout().flush().ok();
}
