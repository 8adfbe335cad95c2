use sfs_core::{DirentType, Error, OpenFlags, Path, SimpleFsConfig};

use tempfile::tempdir;
use tokio::fs;
use tracing_test::traced_test;

mod helpers;

use helpers::{home, mkdir, read_file, simplefs, simplefs_with, write_file};

#[tokio::test]
#[traced_test]
async fn positional_reads_and_writes() {
	let (simplefs, memory) = simplefs();

	let id = simplefs.make_op_id();
	simplefs
		.open(id, home("notes.txt"), OpenFlags::WRITE)
		.await
		.unwrap();

	simplefs.write(id, 0, b"hello world").await.unwrap();
	simplefs.write(id, 6, b"there").await.unwrap();

	assert_eq!(simplefs.read(id, 0, 5).await.unwrap(), b"hello");
	assert_eq!(simplefs.read(id, 6, 100).await.unwrap(), b"there");
	assert_eq!(simplefs.read(id, 0, 0).await.unwrap(), b"hello there");
	assert!(simplefs.read(id, 11, 10).await.unwrap().is_empty());

	let syncs = memory.sync_count();
	simplefs.close(id).await.unwrap();
	assert_eq!(memory.sync_count(), syncs + 1);

	assert!(matches!(
		simplefs.read(id, 0, 1).await,
		Err(Error::NoSuchHandle(_))
	));
}

#[tokio::test]
#[traced_test]
async fn oversized_requests_fail_or_shrink() {
	let (simplefs, _) = simplefs_with(SimpleFsConfig {
		copy_buffer_size: 2,
		..Default::default()
	});
	write_file(&simplefs, home("small.txt"), b"abcdefg").await;

	let id = simplefs.make_op_id();
	simplefs
		.open(id, home("small.txt"), OpenFlags::WRITE | OpenFlags::EXISTING)
		.await
		.unwrap();

	assert_eq!(simplefs.read(id, 0, usize::MAX).await.unwrap(), b"abcdefg");
	assert_eq!(simplefs.read(id, 2, 3).await.unwrap(), b"cde");
	assert!(simplefs.read(id, u64::MAX, usize::MAX).await.unwrap().is_empty());

	assert!(matches!(
		simplefs.write(id, u64::MAX, b"x").await,
		Err(Error::Remote(sfs_remote_fs::Error::FileTooLarge(_)))
	));
	assert!(simplefs.get_ops().is_empty());

	simplefs.close(id).await.unwrap();
	assert_eq!(read_file(&simplefs, home("small.txt")).await, b"abcdefg");
}

#[tokio::test]
#[traced_test]
async fn reads_are_tracked_while_running() {
	let (simplefs, _) = simplefs();
	write_file(&simplefs, home("data.bin"), &[7; 100]).await;

	let id = simplefs.make_op_id();
	simplefs
		.open(id, home("data.bin"), OpenFlags::EXISTING)
		.await
		.unwrap();

	simplefs.read(id, 0, 10).await.unwrap();

	// Done and unregistered, only the handle is left
	assert!(simplefs.get_ops().is_empty());
	assert_eq!(simplefs.check(id).unwrap(), Default::default());
	assert!(matches!(simplefs.wait(id).await, Err(Error::NoSuchHandle(_))));

	simplefs.close(id).await.unwrap();
}

#[tokio::test]
#[traced_test]
async fn small_default_read_size() {
	let mut config = SimpleFsConfig::default();
	config.default_read_size = 4;
	let (simplefs, _) = simplefs_with(config);
	write_file(&simplefs, home("data.txt"), b"0123456789").await;

	let id = simplefs.make_op_id();
	simplefs
		.open(id, home("data.txt"), OpenFlags::EXISTING)
		.await
		.unwrap();
	assert_eq!(simplefs.read(id, 0, 0).await.unwrap(), b"0123");
	simplefs.close(id).await.unwrap();

	assert_eq!(read_file(&simplefs, home("data.txt")).await, b"0123456789");
}

#[tokio::test]
#[traced_test]
async fn open_flags() {
	let (simplefs, _) = simplefs();
	write_file(&simplefs, home("log.txt"), b"one").await;

	// Existing entries are required to exist
	let id = simplefs.make_op_id();
	assert!(matches!(
		simplefs
			.open(id, home("missing.txt"), OpenFlags::EXISTING)
			.await,
		Err(Error::Remote(sfs_remote_fs::Error::NotFound(_)))
	));

	// Appending starts at the end
	simplefs
		.open(id, home("log.txt"), OpenFlags::WRITE | OpenFlags::APPEND)
		.await
		.unwrap();
	simplefs.close(id).await.unwrap();

	// Replacing truncates
	write_file(&simplefs, home("log.txt"), b"two").await;
	assert_eq!(read_file(&simplefs, home("log.txt")).await, b"two");

	assert!(matches!(
		simplefs
			.open(id, home("log.txt"), OpenFlags::APPEND | OpenFlags::REPLACE)
			.await,
		Err(Error::BadArgument(_))
	));
	assert!(matches!(
		OpenFlags::checked(1 << 10),
		Err(Error::BadArgument(_))
	));

	// A file can't be opened as a directory and the other way around
	assert!(matches!(
		simplefs
			.open(id, home("log.txt"), OpenFlags::DIRECTORY)
			.await,
		Err(Error::NotADirectory(_))
	));
	mkdir(&simplefs, home("dir")).await;
	assert!(matches!(
		simplefs.open(id, home("dir"), OpenFlags::WRITE).await,
		Err(Error::NotAFile(_))
	));
}

#[tokio::test]
#[traced_test]
async fn directory_handles_have_no_io() {
	let (simplefs, _) = simplefs();

	let id = simplefs.make_op_id();
	simplefs
		.open(id, home("dir"), OpenFlags::DIRECTORY)
		.await
		.unwrap();

	assert!(matches!(
		simplefs.read(id, 0, 10).await,
		Err(Error::NotOpenForIo(other)) if other == id
	));
	assert!(matches!(
		simplefs.write(id, 0, b"x").await,
		Err(Error::NotOpenForIo(_))
	));

	simplefs.close(id).await.unwrap();
	assert_eq!(
		simplefs.stat(home("dir")).await.unwrap().dirent_type,
		DirentType::Dir
	);
}

#[tokio::test]
#[traced_test]
async fn cancel_drops_open_handles() {
	let (simplefs, _) = simplefs();

	let id = simplefs.make_op_id();
	simplefs
		.open(id, home("file.txt"), OpenFlags::WRITE)
		.await
		.unwrap();
	assert!(simplefs.check(id).is_ok());

	simplefs.cancel(id);

	assert!(matches!(simplefs.check(id), Err(Error::NoResult(_))));
	assert!(matches!(
		simplefs.write(id, 0, b"x").await,
		Err(Error::NoSuchHandle(_))
	));
}

#[tokio::test]
#[traced_test]
async fn set_stat_toggles_executable() {
	let (simplefs, _) = simplefs();
	write_file(&simplefs, home("run.sh"), b"#!/bin/sh").await;

	simplefs
		.set_stat(home("run.sh"), DirentType::Exec)
		.await
		.unwrap();
	assert_eq!(
		simplefs.stat(home("run.sh")).await.unwrap().dirent_type,
		DirentType::Exec
	);

	// Only the executable bit can be changed
	simplefs
		.set_stat(home("run.sh"), DirentType::Dir)
		.await
		.unwrap();
	assert_eq!(
		simplefs.stat(home("run.sh")).await.unwrap().dirent_type,
		DirentType::Exec
	);

	simplefs
		.set_stat(home("run.sh"), DirentType::File)
		.await
		.unwrap();
	assert_eq!(
		simplefs.stat(home("run.sh")).await.unwrap().dirent_type,
		DirentType::File
	);
}

#[tokio::test]
#[traced_test]
async fn local_handles() {
	let (simplefs, _) = simplefs();
	let dir = tempdir().unwrap();
	let path = dir.path().join("local.txt");

	let id = simplefs.make_op_id();
	simplefs
		.open(id, Path::local(&path), OpenFlags::WRITE)
		.await
		.unwrap();
	simplefs.write(id, 0, b"local bytes").await.unwrap();
	assert_eq!(simplefs.read(id, 6, 0).await.unwrap(), b"bytes");
	simplefs.close(id).await.unwrap();

	assert_eq!(fs::read(&path).await.unwrap(), b"local bytes");

	let id = simplefs.make_op_id();
	simplefs
		.open(id, Path::local(&path), OpenFlags::APPEND)
		.await
		.unwrap();
	simplefs.write(id, 0, b"!").await.unwrap();
	simplefs.close(id).await.unwrap();

	assert_eq!(fs::read(&path).await.unwrap(), b"local bytes!");

	let id = simplefs.make_op_id();
	simplefs
		.open(id, Path::local(dir.path()), OpenFlags::EXISTING)
		.await
		.unwrap();
	assert!(matches!(
		simplefs.read(id, 0, 1).await,
		Err(Error::NotOpenForIo(_))
	));
	simplefs.close(id).await.unwrap();
}
