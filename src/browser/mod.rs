//! 浏览器会话建立：连接已运行的 Chrome，或启动一个新窗口

mod connection;
mod launch;

pub use connection::connect_to_browser_and_page;
pub use launch::launch_browser;
