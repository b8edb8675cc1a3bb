use std::{path::Path, sync::mpsc::Sender};

use log::info;

use crate::{
    disk::file_disk::FileDisk,
    fs::{error::Result, FileSystem},
    shell::BootProgress,
};

/// 打开（必要时创建并格式化）镜像，然后挂载。进度通过 `tx` 发给 shell
pub fn perform_disk_initialization(
    path: &Path,
    blocks: u64,
    force_format: bool,
    tx: Sender<BootProgress>,
) {
    let result = initialize(path, blocks, force_format, &tx);
    let _ = tx.send(BootProgress::Finished(result));
}

fn initialize(
    path: &Path,
    blocks: u64,
    force_format: bool,
    tx: &Sender<BootProgress>,
) -> Result<FileSystem<FileDisk>> {
    let _ = tx.send(BootProgress::Step("🧠 Initializing virtual disk..."));
    let disk = FileDisk::open(path, blocks)?;
    let _ = tx.send(BootProgress::Progress(30));

    let fresh = disk.created();
    let mut fs = FileSystem::new(disk);

    // 只有“明确是新磁盘”或用户要求时才格式化
    if fresh || force_format {
        let _ = tx.send(BootProgress::Step("🔧 Formatting new file system..."));
        fs.format()?;
        info!("formatted {}", path.display());
    }
    let _ = tx.send(BootProgress::Progress(50));

    let _ = tx.send(BootProgress::Step("⚙️  Mounting file system..."));
    fs.mount_with_progress(|done, total| {
        let pct = 50 + (done * 50 / total.max(1)) as u64;
        let _ = tx.send(BootProgress::Progress(pct));
    })?;
    let _ = tx.send(BootProgress::Progress(100));

    Ok(fs)
}
