//! Background reconstruction worker.
//!
//! Image decoding and cloud reconstruction run on one worker thread so the
//! event loop never stalls on disk. Each request carries a generation
//! number; completions are only applied when their generation matches the
//! latest request issued, so a slow early load can never clobber a newer
//! one. Results land between frames, never mid-draw.

use std::{
    path::PathBuf,
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
};

use vista_formats::{CloudSource, FormatError};

struct Job {
    generation: u64,
    depth_path: PathBuf,
    color_path: PathBuf,
    field_of_view: f32,
}

struct Completion {
    generation: u64,
    outcome: Result<CloudSource, FormatError>,
}

pub struct CloudLoader {
    jobs: Sender<Job>,
    completions: Receiver<Completion>,
    latest_issued: u64,
}

impl CloudLoader {
    pub fn spawn() -> Self {
        let (jobs, job_rx) = mpsc::channel::<Job>();
        let (completion_tx, completions) = mpsc::channel::<Completion>();
        thread::spawn(move || {
            for job in job_rx.iter() {
                let outcome =
                    CloudSource::from_paths(&job.depth_path, &job.color_path, job.field_of_view);
                let completion = Completion {
                    generation: job.generation,
                    outcome,
                };
                if completion_tx.send(completion).is_err() {
                    break;
                }
            }
        });
        CloudLoader {
            jobs,
            completions,
            latest_issued: 0,
        }
    }

    /// Queues a reconstruction and returns its generation.
    pub fn request(&mut self, depth_path: PathBuf, color_path: PathBuf, field_of_view: f32) -> u64 {
        self.latest_issued += 1;
        let job = Job {
            generation: self.latest_issued,
            depth_path,
            color_path,
            field_of_view,
        };
        if self.jobs.send(job).is_err() {
            log::error!("cloud loader worker is gone; reconstruction unavailable");
        }
        self.latest_issued
    }

    /// Drains finished work. Stale generations and failures are logged and
    /// dropped; only a completion for the latest request comes back.
    pub fn poll(&mut self) -> Option<CloudSource> {
        let mut fresh = None;
        loop {
            match self.completions.try_recv() {
                Ok(completion) => {
                    if completion.generation != self.latest_issued {
                        log::debug!(
                            "dropping stale cloud generation {} (latest {})",
                            completion.generation,
                            self.latest_issued
                        );
                        continue;
                    }
                    match completion.outcome {
                        Ok(source) => fresh = Some(source),
                        Err(error) => {
                            log::warn!("cloud reconstruction failed: {error}");
                        }
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        fresh
    }
}

#[cfg(test)]
mod cloud_loader_tests {
    use std::time::{Duration, Instant};

    use image::RgbaImage;

    use super::*;

    fn write_pair(dir: &std::path::Path) -> (PathBuf, PathBuf) {
        let depth_path = dir.join("depth.png");
        let color_path = dir.join("color.png");
        RgbaImage::from_pixel(2, 2, image::Rgba([128, 128, 128, 255]))
            .save(&depth_path)
            .expect("save depth png");
        RgbaImage::from_pixel(2, 2, image::Rgba([20, 40, 60, 255]))
            .save(&color_path)
            .expect("save color png");
        (depth_path, color_path)
    }

    fn poll_until(loader: &mut CloudLoader) -> Option<CloudSource> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(source) = loader.poll() {
                return Some(source);
            }
            thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[test]
    fn completed_request_comes_back_ready() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (depth_path, color_path) = write_pair(dir.path());
        let mut loader = CloudLoader::spawn();
        loader.request(depth_path, color_path, 75.0);
        let source = poll_until(&mut loader).expect("reconstruction finished");
        assert!(source.is_ready());
        assert_eq!(source.cloud().len(), 4);
    }

    #[test]
    fn stale_generation_is_discarded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (depth_path, color_path) = write_pair(dir.path());
        let mut loader = CloudLoader::spawn();
        loader.request(depth_path.clone(), color_path.clone(), 75.0);
        loader.request(depth_path, color_path, 30.0);
        // The worker runs jobs in order, so the first completion arrives
        // stale and must be dropped in favor of the second.
        let source = poll_until(&mut loader).expect("latest generation arrived");
        assert!((source.field_of_view() - 30.0).abs() < 1e-6);
    }

    #[test]
    fn failed_load_produces_no_cloud() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut loader = CloudLoader::spawn();
        loader.request(
            dir.path().join("missing_depth.png"),
            dir.path().join("missing_color.png"),
            75.0,
        );
        // Wait for the worker to finish, then confirm nothing was applied.
        thread::sleep(Duration::from_millis(200));
        assert!(loader.poll().is_none());
    }
}
