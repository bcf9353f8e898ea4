//! Double-buffered slab manager over the segment files.
//!
//! Two fixed-size slabs straddle the boundary between the segment being
//! appended and the segment being replayed. The writer owns one slab and
//! appends records both to it and to the active segment file; the reader
//! either shares that slab (same segment) or replays sealed segments
//! loaded on demand into the other one.
//!
//! # Concurrency
//!
//! One producer thread calls [`WalBuffer::append`] and one consumer thread
//! calls [`WalBuffer::next`]. A single mutex guards the cursor pair and is
//! never held across file I/O or (de)serialization. Slab bytes below the
//! writer's published offset do not change until a rollover recycles the
//! slab, and the reader never chases the writer past that offset, which is
//! what keeps the lock-free byte accesses disjoint.

use std::cell::UnsafeCell;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::file_handler::{LogFileHandler, OpenMode};
use super::record::{decode_record, encode_record, encoded_len};
use super::{build_lsn, parse_lsn, LSN_OFFSET_MASK};
use crate::options::{WalOptions, WAL_BUFFER_MAX_SIZE, WAL_BUFFER_MIN_SIZE};
use crate::types::{LogRecord, MutationType};
use crate::util::filename;
use crate::{Error, Result};

/// Writer-side position: the slab and segment currently being appended.
#[derive(Debug, Clone, Copy, Default)]
struct WriterCursor {
    file_no: u32,
    buf_idx: usize,
    buf_offset: u32,
}

/// Reader-side position. `max_offset` bounds the slab once its segment is
/// sealed; while the reader shares the writer's segment the effective
/// bound is the writer's offset instead.
#[derive(Debug, Clone, Copy, Default)]
struct ReaderCursor {
    file_no: u32,
    buf_idx: usize,
    buf_offset: u32,
    max_offset: u32,
}

#[derive(Debug, Default)]
struct CursorPair {
    writer: WriterCursor,
    reader: ReaderCursor,
}

/// One fixed-size in-memory byte slab.
///
/// Byte ranges are handed out through raw pointers; the
/// single-producer/single-consumer discipline documented on [`WalBuffer`]
/// keeps concurrently outstanding ranges disjoint.
struct Slab(Box<[UnsafeCell<u8>]>);

impl Slab {
    fn alloc(size: u32) -> Self {
        Slab((0..size).map(|_| UnsafeCell::new(0)).collect())
    }

    fn as_ptr(&self) -> *mut u8 {
        self.0.as_ptr() as *mut u8
    }

    /// # Safety
    ///
    /// The caller must own `[start, start + len)` exclusively: the writer
    /// at or above its published offset, the reader loading a slab the
    /// writer does not share, or any caller holding `&mut WalBuffer`.
    unsafe fn slice_mut(&self, start: u32, len: u32) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.as_ptr().add(start as usize), len as usize)
    }

    /// # Safety
    ///
    /// `[start, start + len)` must lie below the writer's published offset
    /// (shared slab) or within the reader's loaded range (sealed slab).
    unsafe fn slice(&self, start: u32, len: u32) -> &[u8] {
        std::slice::from_raw_parts(self.as_ptr().add(start as usize), len as usize)
    }
}

/// Double-buffered write-ahead log over a directory of `<N>.wal` segments.
///
/// The storage engine owns exactly one `WalBuffer`. [`init`] must run once
/// before anything else; afterwards [`append`] belongs to the producer
/// thread and [`next`] to the consumer thread, which may share the buffer
/// through `Arc`. The exclusive operations ([`reset`], [`set_write_lsn`])
/// are for quiescent management points such as truncation or fast-forward.
///
/// [`init`]: WalBuffer::init
/// [`append`]: WalBuffer::append
/// [`next`]: WalBuffer::next
/// [`reset`]: WalBuffer::reset
/// [`set_write_lsn`]: WalBuffer::set_write_lsn
pub struct WalBuffer {
    dir: PathBuf,
    buffer_size: u32,
    slabs: [Slab; 2],
    cursors: Mutex<CursorPair>,
    /// Active segment appender. Producer-owned: only `append` and the
    /// exclusive management operations touch it.
    appender: UnsafeCell<LogFileHandler>,
}

// Safety: slab bytes and the appender are partitioned between exactly one
// producer (`append`) and one consumer (`next`) as described in the module
// docs; all remaining shared state sits behind the cursor mutex.
unsafe impl Send for WalBuffer {}
unsafe impl Sync for WalBuffer {}

impl WalBuffer {
    /// Create an uninitialized buffer for the segments under
    /// `options.path`, clamping the slab size into
    /// `[WAL_BUFFER_MIN_SIZE, WAL_BUFFER_MAX_SIZE]`.
    pub fn new(options: &WalOptions) -> Result<Self> {
        options.validate()?;

        let mut buffer_size = options.buffer_size;
        if buffer_size < WAL_BUFFER_MIN_SIZE {
            info!(configured = buffer_size, "wal buffer size too small, clamping");
            buffer_size = WAL_BUFFER_MIN_SIZE;
        } else if buffer_size > WAL_BUFFER_MAX_SIZE {
            info!(configured = buffer_size, "wal buffer size too large, clamping");
            buffer_size = WAL_BUFFER_MAX_SIZE;
        }

        filename::create_dir_if_missing(&options.path)?;

        Ok(Self {
            dir: options.path.clone(),
            buffer_size,
            slabs: [Slab::alloc(0), Slab::alloc(0)],
            cursors: Mutex::new(CursorPair::default()),
            appender: UnsafeCell::new(LogFileHandler::new(&options.path)),
        })
    }

    /// Capacity of one slab. Recovery may have grown this past the
    /// configured value.
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// Rebuild buffer and cursor state from the on-disk segments.
    ///
    /// `start_lsn` is the applied-through position (the reader begins just
    /// past it) and `end_lsn` the durably-appended position (the writer
    /// resumes there); both come from the engine's meta-store. Afterwards
    /// the reader can replay exactly `(start_lsn, end_lsn]` and the writer
    /// appends at `end_lsn`.
    pub fn init(&mut self, start_lsn: u64, end_lsn: u64) -> Result<()> {
        debug!(start_lsn, end_lsn, "init wal buffer");

        if start_lsn > end_lsn {
            return Err(Error::corruption(
                "applied position is past the appended position",
            ));
        }

        let mut reader = ReaderCursor::default();
        let mut writer = WriterCursor::default();
        (reader.file_no, reader.buf_offset) = parse_lsn(start_lsn);
        (writer.file_no, writer.buf_offset) = parse_lsn(end_lsn);

        if start_lsn == end_lsn {
            // Nothing to replay. A partial tail is abandoned: the external
            // position is already past it, so start the next segment clean.
            if writer.buf_offset != 0 {
                writer.file_no += 1;
                writer.buf_offset = 0;
                reader.file_no += 1;
                reader.buf_offset = 0;
            }
        } else {
            // One slab must fit every sealed segment awaiting replay and
            // the live tail.
            let mut need = 0u32;
            for file_no in reader.file_no..writer.file_no {
                let path = filename::wal_file_path(&self.dir, file_no);
                let size = match filename::file_size(&path) {
                    Ok(size) => size,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        error!(file_no, "wal segment missing");
                        return Err(Error::SegmentNotFound(file_no));
                    }
                    Err(e) => return Err(e.into()),
                };
                if size == 0 {
                    error!(file_no, "bad wal segment");
                    return Err(Error::EmptySegment(file_no));
                }
                need = need.max(size as u32);
            }
            need = need.max(writer.buf_offset);
            if need > self.buffer_size {
                info!(buffer_size = need, "recovery needs a larger wal buffer");
                self.buffer_size = need;
            }
        }

        self.slabs = [Slab::alloc(self.buffer_size), Slab::alloc(self.buffer_size)];

        let appender = self.appender.get_mut();
        if reader.file_no == writer.file_no {
            // Single-slab mode: reader and writer share the live segment.
            reader.buf_idx = 0;
            writer.buf_idx = 0;

            appender.set_file_name(writer.file_no);
            if writer.buf_offset == 0 {
                appender.set_open_mode(OpenMode::Write);
                appender.open_file()?;
            } else {
                appender.set_open_mode(OpenMode::ReadWrite);
                if !appender.file_exists() {
                    error!(file_no = writer.file_no, "wal segment missing");
                    return Err(Error::SegmentNotFound(writer.file_no));
                }
                appender.open_file()?;

                let len = writer.buf_offset - reader.buf_offset;
                // Safety: exclusive access through `&mut self`.
                let dst = unsafe { self.slabs[0].slice_mut(reader.buf_offset, len) };
                appender.load(dst, reader.buf_offset)?;
                // Drop any torn bytes past the durable position so new
                // appends land exactly at the writer offset.
                appender.truncate(writer.buf_offset)?;
            }
        } else {
            // Two-slab mode: sealed reader segment in slab 0, live tail in
            // slab 1.
            reader.buf_idx = 0;
            writer.buf_idx = 1;

            let mut loader = LogFileHandler::new(&self.dir);
            loader.set_file_name(reader.file_no);
            loader.set_open_mode(OpenMode::Read);
            if !loader.file_exists() {
                error!(file_no = reader.file_no, "wal segment missing");
                return Err(Error::SegmentNotFound(reader.file_no));
            }
            reader.max_offset = loader.file_size()? as u32;
            if reader.buf_offset > reader.max_offset {
                return Err(Error::corruption(
                    "applied position is past the end of its segment",
                ));
            }
            let len = reader.max_offset - reader.buf_offset;
            // Safety: exclusive access through `&mut self`.
            let dst = unsafe { self.slabs[0].slice_mut(reader.buf_offset, len) };
            loader.load(dst, reader.buf_offset)?;
            loader.close_file();

            appender.set_file_name(writer.file_no);
            appender.set_open_mode(OpenMode::ReadWrite);
            if !appender.file_exists() {
                error!(file_no = writer.file_no, "wal segment missing");
                return Err(Error::SegmentNotFound(writer.file_no));
            }
            appender.open_file()?;
            if writer.buf_offset > 0 {
                // Safety: exclusive access through `&mut self`.
                let dst = unsafe { self.slabs[1].slice_mut(0, writer.buf_offset) };
                appender.load(dst, 0)?;
            }
            appender.truncate(writer.buf_offset)?;
        }

        *self.cursors.get_mut() = CursorPair { writer, reader };
        Ok(())
    }

    /// Discard buffer contents and start a fresh segment after `lsn`.
    ///
    /// Always begins on a file boundary: an `lsn` pointing into the middle
    /// of a segment advances to the next one.
    pub fn reset(&mut self, lsn: u64) -> Result<()> {
        debug!(lsn, "reset wal buffer");

        self.slabs = [Slab::alloc(self.buffer_size), Slab::alloc(self.buffer_size)];

        let (mut file_no, offset) = parse_lsn(lsn);
        if offset != 0 {
            file_no += 1;
        }

        let cursors = self.cursors.get_mut();
        cursors.writer = WriterCursor {
            file_no,
            buf_idx: 0,
            buf_offset: 0,
        };
        cursors.reader = ReaderCursor {
            file_no,
            buf_idx: 0,
            buf_offset: 0,
            max_offset: 0,
        };

        self.appender.get_mut().reborn(file_no)
    }

    /// Durably append `record`, assigning and returning its LSN.
    ///
    /// Producer thread only. Either the record reaches the OS and its LSN
    /// is returned, or an error surfaces and the record stays invisible to
    /// the reader; no record is ever silently dropped.
    pub fn append(&self, record: &mut LogRecord) -> Result<u64> {
        let exact = encoded_len(record);
        if exact > self.buffer_size as usize {
            return Err(Error::RecordTooLarge {
                size: exact.min(u32::MAX as usize) as u32,
                max: self.buffer_size,
            });
        }
        if record.collection_id.len() > u16::MAX as usize
            || record.partition_tag.len() > u16::MAX as usize
        {
            return Err(Error::RecordTooLarge {
                size: exact.min(u32::MAX as usize) as u32,
                max: u16::MAX as u32,
            });
        }
        let size = exact as u32;

        // Safety: the appender is producer-owned (see struct docs).
        let appender = unsafe { &mut *self.appender.get() };

        let mut rollover = false;
        let (file_no, buf_idx, buf_offset);
        {
            let mut cursors = self.cursors.lock();
            if self.buffer_size - cursors.writer.buf_offset < size {
                // Seal the current segment and roll over to the next one.
                if cursors.writer.buf_idx == cursors.reader.buf_idx {
                    cursors.reader.max_offset = cursors.writer.buf_offset;
                    cursors.writer.buf_idx ^= 1;
                }
                cursors.writer.file_no += 1;
                cursors.writer.buf_offset = 0;
                rollover = true;
            }
            file_no = cursors.writer.file_no;
            buf_idx = cursors.writer.buf_idx;
            buf_offset = cursors.writer.buf_offset;
        }

        if rollover {
            if let Err(e) = appender.reborn(file_no) {
                error!(file_no, "wal segment rollover failed");
                return Err(e);
            }
        }

        // The header lsn points just past the record, making it
        // self-locating on disk.
        let lsn = build_lsn(file_no, buf_offset + size);

        // Safety: the writer exclusively owns slab bytes at and above its
        // published offset until the next rollover.
        let dst = unsafe { self.slabs[buf_idx].slice_mut(buf_offset, size) };
        encode_record(record, lsn, dst);

        if let Err(e) = appender.write(dst) {
            error!(file_no, "wal segment write failed");
            return Err(e);
        }

        // Publish to the reader only after the OS write landed.
        self.cursors.lock().writer.buf_offset = buf_offset + size;

        record.lsn = lsn;
        Ok(lsn)
    }

    /// Fetch the next record, bounded by `last_applied_lsn`.
    ///
    /// At end-of-stream the record's mutation type is
    /// [`MutationType::None`] and `Ok(())` is returned; a decode or load
    /// failure is an error. Consumer thread only.
    pub fn next(&self, last_applied_lsn: u64, record: &mut LogRecord) -> Result<()> {
        record.mutation = MutationType::None;

        // Reader caught up with the applier bound; nothing to hand out yet.
        if self.read_lsn() >= last_applied_lsn {
            return Ok(());
        }

        // Otherwise a record exists, in memory or in a segment not yet
        // loaded.
        let mut need_load = false;
        let (file_no, buf_idx, buf_offset, mut bound);
        {
            let mut cursors = self.cursors.lock();
            if cursors.reader.file_no != cursors.writer.file_no
                && cursors.reader.buf_offset == cursors.reader.max_offset
            {
                // Sealed segment fully replayed; move to the next one.
                cursors.reader.file_no += 1;
                cursors.reader.buf_offset = 0;
                if cursors.reader.file_no == cursors.writer.file_no {
                    // Caught up to the live segment: adopt the writer slab.
                    cursors.reader.buf_idx = cursors.writer.buf_idx;
                } else {
                    need_load = true;
                }
            }
            file_no = cursors.reader.file_no;
            buf_idx = cursors.reader.buf_idx;
            buf_offset = cursors.reader.buf_offset;
            bound = if cursors.reader.file_no == cursors.writer.file_no {
                cursors.writer.buf_offset
            } else {
                cursors.reader.max_offset
            };
        }

        if need_load {
            let mut loader = LogFileHandler::new(&self.dir);
            loader.set_file_name(file_no);
            loader.set_open_mode(OpenMode::Read);
            if let Err(e) = loader.open_file() {
                error!(file_no, "open wal segment failed");
                return Err(e);
            }
            let size = loader.file_size()?;
            if size > self.buffer_size as u64 {
                return Err(Error::corruption(
                    "wal segment exceeds the buffer capacity",
                ));
            }
            let size = size as u32;
            // Safety: in two-slab mode the reader exclusively owns its
            // slab; `need_load` implies the writer is in a later segment.
            let dst = unsafe { self.slabs[buf_idx].slice_mut(0, size) };
            if let Err(e) = loader.load(dst, 0) {
                error!(file_no, "load wal segment failed");
                return Err(e);
            }
            self.cursors.lock().reader.max_offset = size;
            bound = size;
        }

        if buf_offset > bound {
            return Err(Error::corruption("reader is past the readable bound"));
        }

        // Safety: bytes below `bound` are sealed (own slab) or already
        // published by the writer (shared slab) and no longer change.
        let src = unsafe { self.slabs[buf_idx].slice(buf_offset, bound - buf_offset) };
        let decoded = decode_record(src)?;

        let next_offset = (decoded.lsn & LSN_OFFSET_MASK) as u32;
        if next_offset <= buf_offset || next_offset > bound {
            return Err(Error::corruption(
                "record lsn disagrees with buffer bounds",
            ));
        }

        *record = decoded;
        self.cursors.lock().reader.buf_offset = next_offset;
        Ok(())
    }

    /// LSN of the next record the reader will consume.
    pub fn read_lsn(&self) -> u64 {
        let cursors = self.cursors.lock();
        build_lsn(cursors.reader.file_no, cursors.reader.buf_offset)
    }

    /// LSN at which the writer will append next.
    pub fn write_lsn(&self) -> u64 {
        let cursors = self.cursors.lock();
        build_lsn(cursors.writer.file_no, cursors.writer.buf_offset)
    }

    /// Move the writer to `lsn` after external truncation or fast-forward.
    ///
    /// Within the current segment only the offset changes; on the reader's
    /// segment the writer adopts the reader's slab; otherwise the target
    /// segment is reopened, its prefix `[0, offset)` loaded into the
    /// writer slab, and the file cut to `offset` so appends continue
    /// exactly there.
    pub fn set_write_lsn(&mut self, lsn: u64) -> Result<()> {
        let (file_no, buf_offset) = parse_lsn(lsn);

        let buf_idx;
        {
            let cursors = self.cursors.get_mut();
            let old_file_no = cursors.writer.file_no;
            cursors.writer.file_no = file_no;
            cursors.writer.buf_offset = buf_offset;

            if file_no == old_file_no {
                return Ok(());
            }
            if file_no == cursors.reader.file_no {
                cursors.writer.buf_idx = cursors.reader.buf_idx;
                return Ok(());
            }
            buf_idx = cursors.writer.buf_idx;
        }

        let appender = self.appender.get_mut();
        appender.close_file();
        appender.set_file_name(file_no);

        if appender.file_exists() {
            appender.set_open_mode(OpenMode::ReadWrite);
            appender.open_file()?;
            if buf_offset > 0 {
                // Safety: exclusive access through `&mut self`.
                let dst = unsafe { self.slabs[buf_idx].slice_mut(0, buf_offset) };
                appender.load(dst, 0)?;
            }
            appender.truncate(buf_offset)?;
        } else {
            if buf_offset != 0 {
                error!(file_no, "wal segment missing for write lsn");
                return Err(Error::SegmentNotFound(file_no));
            }
            appender.set_open_mode(OpenMode::Write);
            appender.open_file()?;
        }
        Ok(())
    }

    /// Delete sealed segments wholly behind `lsn`, keeping every file the
    /// reader still needs. Returns how many were removed.
    ///
    /// Called after the applier has persisted its position; requires
    /// exclusive access like the other management operations.
    pub fn remove_segments_before(&mut self, lsn: u64) -> Result<usize> {
        let (file_no, _) = parse_lsn(lsn);
        let keep_from = file_no.min(self.cursors.get_mut().reader.file_no);

        let mut removed = 0;
        for no in filename::list_wal_files(&self.dir)? {
            if no < keep_from {
                filename::delete_file(&filename::wal_file_path(&self.dir, no))?;
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, keep_from, "truncated wal segments");
        }
        Ok(removed)
    }
}
