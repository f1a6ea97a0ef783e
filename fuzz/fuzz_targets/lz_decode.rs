use easy::lz;
use honggfuzz::fuzz;

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            if let Ok(out) = lz::decode(data) {
                let declared = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
                assert_eq!(out.len(), declared as usize);
            }
            if let Some((&len, raw)) = data.split_first() {
                let _ = lz::decode_raw(raw, len as usize * 4);
            }
        });
    }
}
