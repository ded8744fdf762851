use candle_core::{Device, Tensor};
use chunklab_core::EmbedError;
use tokenizers::Tokenizer;

/// Encode `text` into `[1, max_len]` id and mask tensors, truncating or padding with id 1.
pub fn tokenize_on_device(
    tokenizer: &Tokenizer,
    text: &str,
    max_len: usize,
    device: &Device,
) -> Result<(Tensor, Tensor), EmbedError> {
    let enc = tokenizer
        .encode(text, true)
        .map_err(|e| EmbedError::inference("tokenization failed").with_detail(e.to_string()))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    ids.truncate(max_len);
    mask.truncate(max_len);
    let pad = max_len - ids.len();
    ids.extend(std::iter::repeat(1).take(pad));
    mask.extend(std::iter::repeat(0).take(pad));

    let to_tensor = |v: Vec<u32>| {
        Tensor::from_iter(v, device)
            .and_then(|t| t.reshape((1, max_len)))
            .map_err(|e| EmbedError::inference("failed to build input tensor").with_detail(e.to_string()))
    };
    Ok((to_tensor(ids)?, to_tensor(mask)?))
}
