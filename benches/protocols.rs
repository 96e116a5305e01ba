use criterion::{black_box, criterion_group, criterion_main, Criterion};
use k256::ecdsa::SigningKey;
use partially_blind_ecdsa::{
    curve_order, protocol::Parameters, BlindSignatureClient, BlindSignatureServer, MemoryStore,
    SignerHello, SignerKey,
};
use rand_core::OsRng;

fn signer() -> BlindSignatureServer<MemoryStore> {
    let key = SignerKey::from_signing_key(&SigningKey::random(&mut OsRng));
    BlindSignatureServer::new(key, MemoryStore::new(), Parameters::default()).unwrap()
}

fn client(hello: &SignerHello) -> BlindSignatureClient {
    BlindSignatureClient::new()
        .with_signer_key(&hello.k1_x, &hello.k1_y)
        .unwrap()
        .with_message("coin: 123456789")
        .with_info("user: alice")
        .generate_keys(&mut OsRng, &curve_order())
        .unwrap()
}

fn bench_keygen(c: &mut Criterion) {
    let mut signer = signer();
    let hello = signer.start(&mut OsRng, "bench").unwrap();
    c.bench_function("client keygen", |b| b.iter(|| client(black_box(&hello))));
}

fn bench_respond(c: &mut Criterion) {
    let mut signer = signer();
    let hello = signer.start(&mut OsRng, "bench").unwrap();
    let client = client(&hello);
    c.bench_function("client respond (20 rounds)", |b| {
        b.iter(|| client.respond(&mut OsRng, black_box(&hello.b_list)).unwrap())
    });
}

fn bench_verify(c: &mut Criterion) {
    let mut signer = signer();
    let hello = signer.start(&mut OsRng, "bench").unwrap();
    let payload = client(&hello).respond(&mut OsRng, &hello.b_list).unwrap();
    let record = signer.session("bench").unwrap();
    let q = curve_order();
    c.bench_function("signer verify (20 rounds)", |b| {
        b.iter(|| partially_blind_ecdsa::verify_payload(&record, black_box(&payload), &q).unwrap())
    });
}

criterion_group!(benches, bench_keygen, bench_respond, bench_verify);
criterion_main!(benches);
