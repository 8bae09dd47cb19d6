pub mod joint_predictor;
