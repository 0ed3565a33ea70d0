use super::byte_buffer::ByteBuffer;
use super::varint::{varint_read, varint_write, MAX_VARINT_LEN};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use test::Bencher;

#[bench]
fn varint_write_rand_1000(b: &mut Bencher) {
    let values = random_values(1000);
    let mut buf = [0; MAX_VARINT_LEN];
    b.iter(|| {
        for v in values.iter() {
            let _ = varint_write(*v, &mut buf);
        }
    });
}

#[bench]
fn varint_read_rand_1000(b: &mut Bencher) {
    let mut buf = ByteBuffer::new();
    for v in random_values(1000) {
        buf.put_varint(v);
    }
    b.iter(|| {
        let mut bytes = buf.as_slice();
        while let Some((_, len)) = varint_read(bytes) {
            bytes = &bytes[len..];
        }
    });
}

fn random_values(num: usize) -> Vec<u64> {
    let mut rng = SmallRng::seed_from_u64(num as u64);
    (0..num)
        .map(|_| rng.gen::<u64>() >> rng.gen_range(0..64))
        .collect()
}
