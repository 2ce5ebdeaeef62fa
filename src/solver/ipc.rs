//! Fixed-size binary messages between the orchestrator and its workers, sent
//! over pipes with whole-message semantics: writes and reads are retried on
//! `EINTR` and resumed after partial transfers; EOF mid-message is an error.
//!
//! Everything here is allocation-free so the worker side can run in a freshly
//! forked child of a multithreaded parent.
use std::fmt;
use std::os::unix::io::RawFd;

/// What a task tells the worker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Work,
    Exit,
}

impl Command {
    fn code(self) -> usize {
        match self {
            Command::Work => 1,
            Command::Exit => 2,
        }
    }

    fn from_code(code: usize) -> Option<Command> {
        match code {
            1 => Some(Command::Work),
            2 => Some(Command::Exit),
            _ => None,
        }
    }
}

/// One unit of work: eliminate `column` from the rows in `[start_row, end_row)`,
/// or a termination signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub command: Command,
    pub column: usize,
    pub start_row: usize,
    pub end_row: usize,
}

/// Worker acknowledgment; zero status is success. Its arrival, not only its
/// value, is what releases the per-column barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub status: i32,
}

pub const TASK_BYTES: usize = 4 * size_of::<usize>();
pub const ACK_BYTES: usize = size_of::<i32>();

/// Channel-level failure. Carries the raw errno instead of a formatted string
/// so producing one never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// EOF before a whole message arrived
    Closed,
    /// unknown command code on the wire
    BadMessage,
    /// syscall failure with its errno
    Os(i32),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChannelError::Closed => write!(f, "channel closed mid-message"),
            ChannelError::BadMessage => write!(f, "malformed message on channel"),
            ChannelError::Os(errno) => {
                write!(f, "{}", std::io::Error::from_raw_os_error(*errno))
            }
        }
    }
}

impl Task {
    pub fn work(column: usize, start_row: usize, end_row: usize) -> Task {
        Task {
            command: Command::Work,
            column,
            start_row,
            end_row,
        }
    }

    pub fn exit() -> Task {
        Task {
            command: Command::Exit,
            column: 0,
            start_row: 0,
            end_row: 0,
        }
    }

    /// Fixed native-endian layout: command, column, start_row, end_row, each
    /// one machine word. Both ends live on the same host.
    pub fn encode(&self) -> [u8; TASK_BYTES] {
        let w = size_of::<usize>();
        let mut buf = [0u8; TASK_BYTES];
        buf[..w].copy_from_slice(&self.command.code().to_ne_bytes());
        buf[w..2 * w].copy_from_slice(&self.column.to_ne_bytes());
        buf[2 * w..3 * w].copy_from_slice(&self.start_row.to_ne_bytes());
        buf[3 * w..].copy_from_slice(&self.end_row.to_ne_bytes());
        buf
    }

    pub fn decode(buf: &[u8; TASK_BYTES]) -> Result<Task, ChannelError> {
        let w = size_of::<usize>();
        let word = |i: usize| {
            let mut bytes = [0u8; size_of::<usize>()];
            bytes.copy_from_slice(&buf[i * w..(i + 1) * w]);
            usize::from_ne_bytes(bytes)
        };
        let command = Command::from_code(word(0)).ok_or(ChannelError::BadMessage)?;
        Ok(Task {
            command,
            column: word(1),
            start_row: word(2),
            end_row: word(3),
        })
    }
}

impl Ack {
    pub fn encode(&self) -> [u8; ACK_BYTES] {
        self.status.to_ne_bytes()
    }

    pub fn decode(buf: &[u8; ACK_BYTES]) -> Ack {
        Ack {
            status: i32::from_ne_bytes(*buf),
        }
    }
}

fn last_errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Writes the whole buffer to `fd`, resuming partial writes and retrying on
/// `EINTR`.
pub fn write_full(fd: RawFd, bytes: &[u8]) -> Result<(), ChannelError> {
    let mut written = 0usize;
    while written < bytes.len() {
        // SAFETY: pointer/length denote the unwritten tail of a live slice.
        let ret = unsafe {
            libc::write(
                fd,
                bytes[written..].as_ptr() as *const libc::c_void,
                bytes.len() - written,
            )
        };
        if ret < 0 {
            let errno = last_errno();
            if errno == libc::EINTR {
                continue;
            }
            return Err(ChannelError::Os(errno));
        }
        written += ret as usize;
    }
    Ok(())
}

/// Fills the whole buffer from `fd`; EOF before the buffer is full is
/// [`ChannelError::Closed`].
pub fn read_full(fd: RawFd, bytes: &mut [u8]) -> Result<(), ChannelError> {
    let mut filled = 0usize;
    while filled < bytes.len() {
        // SAFETY: pointer/length denote the unfilled tail of a live slice.
        let ret = unsafe {
            libc::read(
                fd,
                bytes[filled..].as_mut_ptr() as *mut libc::c_void,
                bytes.len() - filled,
            )
        };
        if ret == 0 {
            return Err(ChannelError::Closed);
        }
        if ret < 0 {
            let errno = last_errno();
            if errno == libc::EINTR {
                continue;
            }
            return Err(ChannelError::Os(errno));
        }
        filled += ret as usize;
    }
    Ok(())
}

pub fn send_task(fd: RawFd, task: &Task) -> Result<(), ChannelError> {
    write_full(fd, &task.encode())
}

pub fn recv_task(fd: RawFd) -> Result<Task, ChannelError> {
    let mut buf = [0u8; TASK_BYTES];
    read_full(fd, &mut buf)?;
    Task::decode(&buf)
}

pub fn send_ack(fd: RawFd, ack: Ack) -> Result<(), ChannelError> {
    write_full(fd, &ack.encode())
}

pub fn recv_ack(fd: RawFd) -> Result<Ack, ChannelError> {
    let mut buf = [0u8; ACK_BYTES];
    read_full(fd, &mut buf)?;
    Ok(Ack::decode(&buf))
}
