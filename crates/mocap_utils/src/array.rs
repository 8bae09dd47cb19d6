use ndarray as nd;
use num_traits;

//there is no gather in ndarray, see https://github.com/rust-ndarray/ndarray/issues/526#issuecomment-434917877
pub trait GatherRows<T: nd::ScalarOperand + num_traits::identities::Zero + Copy> {
    fn gather_rows(&self, indices_rows: &[usize]) -> nd::Array2<T>; //dst=src[indices_rows, :]
}
impl<T: nd::ScalarOperand + num_traits::identities::Zero + Copy> GatherRows<T> for nd::Array2<T> {
    fn gather_rows(&self, indices_rows: &[usize]) -> nd::Array2<T> {
        let mut res = nd::Array2::zeros((indices_rows.len(), self.ncols()));
        for (i_out, &i_in) in indices_rows.iter().enumerate() {
            res.row_mut(i_out).assign(&self.row(i_in));
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_rows() {
        let a = nd::array![[0.0f32, 1.0, 2.0], [3.0, 4.0, 5.0], [6.0, 7.0, 8.0]];
        let g = a.gather_rows(&[2, 0]);
        assert_eq!(g, nd::array![[6.0f32, 7.0, 8.0], [0.0, 1.0, 2.0]]);
    }
}
