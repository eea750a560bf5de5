use streamform::{
    get_readable_formdata_stream, iterate_multipart, parse_multipart, stream_multipart,
    ByteSource, FilterFn, FilterOutcome, FormDataStreamOptions, Part, PartData, SliceSource,
    TransformFn, TransformOutcome,
};

/// `parse_multipart` always returns parts in eager mode, so this just
/// unwraps the already-collected body without an `await`.
fn eager_body(part: &Part) -> &[u8] {
    match &part.data {
        PartData::Eager(bytes) => bytes.as_ref(),
        PartData::Lazy(_) => panic!("expected an eager part body"),
    }
}

fn payload_with_two_files() -> &'static [u8] {
    b"\r\n--XBnd\r\n\
Content-Disposition: form-data; name=\"title\"\r\n\r\n\
My Upload\r\n\
--XBnd\r\n\
Content-Disposition: form-data; name=\"doc1\"; filename=\"a.txt\"\r\n\
Content-Type: text/plain\r\n\r\n\
first file contents\r\n\
--XBnd\r\n\
Content-Disposition: form-data; name=\"doc2\"; filename=\"b.bin\"\r\n\
Content-Type: application/octet-stream\r\n\r\n\
\x00\x01binary\xff\r\n\
--XBnd--"
}

async fn parse_with_chunk_size(payload: &[u8], boundary: &str, chunk_size: usize) -> Vec<streamform::Part> {
    let source: Box<dyn ByteSource> = Box::new(SliceSource::chunked(payload, chunk_size));
    parse_multipart(source, boundary).await.expect("parse_multipart")
}

#[tokio::test]
async fn single_text_field_via_public_api() {
    let payload = b"\r\n--bnd\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nform value a\r\n--bnd--";
    let parts = parse_with_chunk_size(payload, "bnd", payload.len()).await;
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].name, "a");
    let body = eager_body(&parts[0]);
    assert_eq!(body, b"form value a");
}

#[tokio::test]
async fn mixed_text_and_files_survive_every_chunking() {
    for chunk_size in [payload_with_two_files().len(), 7, 3, 1] {
        let parts = parse_with_chunk_size(payload_with_two_files(), "XBnd", chunk_size).await;
        assert_eq!(parts.len(), 3, "chunk_size={}", chunk_size);
        assert_eq!(parts[0].name, "title");
        assert_eq!(parts[0].filename, None);
        assert_eq!(eager_body(&parts[0]), b"My Upload");

        assert_eq!(parts[1].name, "doc1");
        assert_eq!(parts[1].filename.as_deref(), Some("a.txt"));
        assert_eq!(parts[1].content_type.as_deref(), Some("text/plain"));
        assert_eq!(eager_body(&parts[1]), b"first file contents");

        assert_eq!(parts[2].name, "doc2");
        assert_eq!(parts[2].filename.as_deref(), Some("b.bin"));
        assert_eq!(
            eager_body(&parts[2]),
            &b"\x00\x01binary\xff"[..]
        );
    }
}

#[tokio::test]
async fn boundary_straddling_byte_chunks_is_still_found() {
    // "--XBnd" is 6 bytes; a 1-byte chunk size forces every boundary match
    // to straddle many feed() calls.
    let parts = parse_with_chunk_size(payload_with_two_files(), "XBnd", 1).await;
    assert_eq!(parts.len(), 3);
}

#[tokio::test]
async fn prologue_and_epilogue_are_discarded() {
    let payload = b"ignore this preamble\r\n--bnd\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nbody\r\n--bnd--\r\ntrailing epilogue junk";
    let parts = parse_with_chunk_size(payload, "bnd", 4).await;
    assert_eq!(parts.len(), 1);
    assert_eq!(eager_body(&parts[0]), b"body");
}

#[tokio::test]
async fn reemit_with_filter_round_trips_through_reparse() {
    let source: Box<dyn ByteSource> = Box::new(SliceSource::chunked(payload_with_two_files(), 9));

    let filter: FilterFn = Box::new(|part| FilterOutcome {
        keep: part.name != "doc2",
        stop: false,
    });

    let (mut out, boundary) = get_readable_formdata_stream(FormDataStreamOptions {
        content_type: "multipart/form-data; boundary=XBnd",
        source,
        output_boundary: None,
        filter: Some(filter),
        transform: None,
    })
    .expect("valid content type");
    assert_eq!(boundary, "XBnd");

    let mut rendered = Vec::new();
    while let Some(chunk) = out.next_chunk().await.expect("next_chunk") {
        rendered.extend_from_slice(&chunk);
    }

    let reparsed_source: Box<dyn ByteSource> = Box::new(SliceSource::whole(&rendered));
    let reparsed = parse_multipart(reparsed_source, &boundary)
        .await
        .expect("re-parse of re-emitted payload");
    assert_eq!(reparsed.len(), 2);
    assert_eq!(reparsed[0].name, "title");
    assert_eq!(reparsed[1].name, "doc1");
    assert_eq!(eager_body(&reparsed[1]), b"first file contents");
}

#[tokio::test]
async fn missing_content_disposition_surfaces_as_error() {
    let payload = b"\r\n--bnd\r\nContent-Type: text/plain\r\n\r\nno disposition at all\r\n--bnd--";
    let source: Box<dyn ByteSource> = Box::new(SliceSource::whole(payload));
    let result = parse_multipart(source, "bnd").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn lazy_stream_yields_parts_in_order_without_eager_collection() {
    let source: Box<dyn ByteSource> = Box::new(SliceSource::chunked(payload_with_two_files(), 5));
    let mut iter = stream_multipart(source, "XBnd");

    let first = iter.next_part().await.unwrap().expect("first part");
    assert_eq!(first.name, "title");
    let first_body = first.collect_body().await.unwrap();
    assert_eq!(&first_body[..], b"My Upload");

    let second = iter.next_part().await.unwrap().expect("second part");
    assert_eq!(second.name, "doc1");
    drop(second); // abandon body deliberately

    let third = iter.next_part().await.unwrap().expect("third part");
    assert_eq!(third.name, "doc2");
    let third_body = third.collect_body().await.unwrap();
    assert_eq!(&third_body[..], b"\x00\x01binary\xff");

    assert!(iter.next_part().await.unwrap().is_none());
}

#[tokio::test]
async fn iterate_multipart_yields_one_eagerly_collected_part_at_a_time() {
    let source: Box<dyn ByteSource> = Box::new(SliceSource::chunked(payload_with_two_files(), 6));
    let mut iter = iterate_multipart(source, "XBnd");

    let first = iter.next().await.unwrap().expect("first part");
    assert_eq!(first.name, "title");
    assert_eq!(eager_body(&first), b"My Upload");

    let second = iter.next().await.unwrap().expect("second part");
    assert_eq!(second.name, "doc1");
    assert_eq!(eager_body(&second), b"first file contents");

    let third = iter.next().await.unwrap().expect("third part");
    assert_eq!(third.name, "doc2");
    assert_eq!(eager_body(&third), b"\x00\x01binary\xff");

    assert!(iter.next().await.unwrap().is_none());
}

#[tokio::test]
async fn filter_and_transform_combine_to_keep_prefix_and_rewrite_filename() {
    let payload: &[u8] = b"\r\n--XBnd\r\n\
Content-Disposition: form-data; name=\"doc1\"; filename=\"a.ts\"\r\n\
Content-Type: text/plain\r\n\r\n\
let x = 1;\r\n\
--XBnd\r\n\
Content-Disposition: form-data; name=\"doc2\"; filename=\"b.bin\"\r\n\
Content-Type: application/octet-stream\r\n\r\n\
\x00\x01binary\xff\r\n\
--XBnd\r\n\
Content-Disposition: form-data; name=\"doc3\"; filename=\"c.ts\"\r\n\
Content-Type: text/plain\r\n\r\n\
let y = 2;\r\n\
--XBnd--";
    let source: Box<dyn ByteSource> = Box::new(SliceSource::chunked(payload, 11));

    let filter: FilterFn = Box::new(|part: &Part| FilterOutcome {
        keep: part.filename.as_deref().map_or(false, |f| f.ends_with(".ts")),
        stop: false,
    });

    let transform: TransformFn = Box::new(|part: Part| {
        Box::pin(async move {
            let name = part.name.clone();
            let filename = part.filename.clone().map(|f| format!("/test{}", f));
            let content_type = part.content_type.clone();
            let body = part.collect_body().await?;
            let mut new_body = Vec::with_capacity(body.len() + 7);
            new_body.extend_from_slice(b"// hdr\n");
            new_body.extend_from_slice(&body);
            Ok(TransformOutcome {
                part: Some(Part {
                    name,
                    filename,
                    content_type,
                    content_length: None,
                    content_transfer_encoding: None,
                    header_lines: None,
                    extra_headers: Default::default(),
                    data: PartData::Eager(new_body.into()),
                }),
                stop: false,
            })
        })
    });

    let (mut out, boundary) = get_readable_formdata_stream(FormDataStreamOptions {
        content_type: "multipart/form-data; boundary=XBnd",
        source,
        output_boundary: None,
        filter: Some(filter),
        transform: Some(transform),
    })
    .expect("valid content type");

    let mut rendered = Vec::new();
    while let Some(chunk) = out.next_chunk().await.expect("next_chunk") {
        rendered.extend_from_slice(&chunk);
    }

    let reparsed_source: Box<dyn ByteSource> = Box::new(SliceSource::whole(&rendered));
    let reparsed = parse_multipart(reparsed_source, &boundary)
        .await
        .expect("re-parse of re-emitted payload");

    assert_eq!(reparsed.len(), 2);
    assert_eq!(reparsed[0].name, "doc1");
    assert_eq!(reparsed[0].filename.as_deref(), Some("/testa.ts"));
    assert_eq!(eager_body(&reparsed[0]), b"// hdr\nlet x = 1;");

    assert_eq!(reparsed[1].name, "doc3");
    assert_eq!(reparsed[1].filename.as_deref(), Some("/testc.ts"));
    assert_eq!(eager_body(&reparsed[1]), b"// hdr\nlet y = 2;");
}

#[tokio::test]
async fn reemit_under_a_different_boundary_reparses_to_the_same_descriptors() {
    let source: Box<dyn ByteSource> = Box::new(SliceSource::chunked(payload_with_two_files(), 13));

    let (mut out, new_boundary) = get_readable_formdata_stream(FormDataStreamOptions {
        content_type: "multipart/form-data; boundary=XBnd",
        source,
        output_boundary: Some("YBoundary".to_string()),
        filter: None,
        transform: None,
    })
    .expect("valid content type");
    assert_eq!(new_boundary, "YBoundary");

    let mut rendered = Vec::new();
    while let Some(chunk) = out.next_chunk().await.expect("next_chunk") {
        rendered.extend_from_slice(&chunk);
    }
    let text = String::from_utf8_lossy(&rendered);
    assert!(!text.contains("--XBnd"));
    assert!(text.contains("--YBoundary"));

    let reparsed_source: Box<dyn ByteSource> = Box::new(SliceSource::whole(&rendered));
    let reparsed = parse_multipart(reparsed_source, &new_boundary)
        .await
        .expect("re-parse with the new boundary");

    let original = parse_with_chunk_size(
        payload_with_two_files(),
        "XBnd",
        payload_with_two_files().len(),
    )
    .await;

    assert_eq!(reparsed.len(), original.len());
    for (a, b) in reparsed.iter().zip(original.iter()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.filename, b.filename);
        assert_eq!(a.content_type, b.content_type);
        assert_eq!(eager_body(a), eager_body(b));
    }
}
