use std::io::Cursor;

use easy::{Archive, OpenMode};
use honggfuzz::fuzz;

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            let Ok(mut archive) = Archive::open(Cursor::new(data), OpenMode::Read) else {
                return;
            };
            for index in 0..archive.len() {
                let _ = archive.verify(index);
            }
        });
    }
}
