// loader.rs — 后台加载图集，只保留最近一次请求的结果

use crate::atlas::{self, CubeAtlas};
use crate::error::ViewerError;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

pub type LoadResult = Result<CubeAtlas, ViewerError>;

/// Runs atlas loads on worker threads. Each request bumps a generation; results
/// from any earlier generation are discarded when they arrive.
pub struct AtlasLoader {
    tx: Sender<(u64, LoadResult)>,
    rx: Receiver<(u64, LoadResult)>,
    generation: u64,
}

impl AtlasLoader {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx, generation: 0 }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Starts loading `path`, superseding any load still in flight.
    pub fn request(&mut self, path: PathBuf, tiles: Option<usize>) {
        let generation = self.next_generation();
        let tx = self.tx.clone();
        thread::spawn(move || {
            log::info!("loading atlas {} in background", path.display());
            let result = atlas::load_atlas(&path, tiles);
            if tx.send((generation, result)).is_err() {
                log::error!("viewer closed before the atlas finished loading");
            }
        });
    }

    /// The result of the latest request, once it has finished.
    pub fn poll(&mut self) -> Option<LoadResult> {
        while let Ok((generation, result)) = self.rx.try_recv() {
            if generation == self.generation {
                return Some(result);
            }
            log::debug!("dropping superseded load {generation} (latest {})", self.generation);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::time::{Duration, Instant};

    fn mono_atlas() -> CubeAtlas {
        CubeAtlas::from_tiles(vec![RgbaImage::new(2, 2); 6]).unwrap()
    }

    #[test]
    fn test_late_result_of_older_request_is_dropped() {
        let mut loader = AtlasLoader::new();
        let first = loader.next_generation();
        let second = loader.next_generation();

        // the newer load finishes first, the older one after it
        loader.tx.send((second, Err(ViewerError::EmptyAtlas))).unwrap();
        loader.tx.send((first, Ok(mono_atlas()))).unwrap();

        assert!(matches!(loader.poll(), Some(Err(ViewerError::EmptyAtlas))));
        assert!(loader.poll().is_none());
    }

    #[test]
    fn test_stale_result_ahead_of_current_is_skipped() {
        let mut loader = AtlasLoader::new();
        let first = loader.next_generation();
        let second = loader.next_generation();

        loader.tx.send((first, Err(ViewerError::EmptyAtlas))).unwrap();
        loader.tx.send((second, Ok(mono_atlas()))).unwrap();

        let atlas = loader.poll().unwrap().unwrap();
        assert_eq!(atlas.tile_size(), 2);
        assert!(loader.poll().is_none());
    }

    #[test]
    fn test_request_delivers_error_for_missing_file() {
        let mut loader = AtlasLoader::new();
        loader.request(PathBuf::from("no/such/atlas.png"), None);

        let deadline = Instant::now() + Duration::from_secs(5);
        let result = loop {
            if let Some(result) = loader.poll() {
                break result;
            }
            assert!(Instant::now() < deadline, "load never finished");
            thread::sleep(Duration::from_millis(10));
        };
        assert!(matches!(result, Err(ViewerError::Open { .. })));
    }
}
