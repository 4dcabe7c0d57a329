//! # workstack-channel
//!
//! Named, file-backed FIFO buffers shared by independent processes through a
//! common directory.
//!
//! Open a [`FileChannel`] on a path, then `push` / `pop` / `size` / `clear`
//! it from any process, or block on it with [`FileChannel::poll_query`] and
//! [`FileChannel::poll_size`] under a [`PollPolicy`].

pub mod error;
pub mod file_channel;
pub mod poll;

pub use error::ChannelError;
pub use file_channel::{remove_backing_file, FileChannel};
pub use poll::PollPolicy;
